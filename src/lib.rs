pub mod catalog;
pub mod error;
pub mod progress;
pub mod review;
pub mod rng;
pub mod scheduler;
pub mod web;

pub use error::{Error, Result};
