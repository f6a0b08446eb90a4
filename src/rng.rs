// Seeded randomness for the daily selection.
//
// mulberry32 over a single u32 state, seeded from a 31-polynomial hash of the
// date string. All arithmetic wraps at 32 bits so the stream is bit-identical
// to the reference generator on every platform.

/// Mulberry32 generator. Yields floats in [0, 1).
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Mulberry32 { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

/// Returns a closure drawing from a fresh `Mulberry32` stream.
pub fn make_rng(seed: u32) -> impl FnMut() -> f64 {
    let mut rng = Mulberry32::new(seed);
    move || rng.next_f64()
}

/// Hashes a date string (`hash * 31 + unit` over UTF-16 code units, i32
/// wraparound) and returns the absolute value.
pub fn date_seed(date: &str) -> u32 {
    let hash = date
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    hash.unsigned_abs()
}

/// Fisher-Yates shuffle into a new vector. The input is left untouched.
pub fn shuffle<T: Clone>(items: &[T], rng: &mut impl FnMut() -> f64) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = (rng() * (i + 1) as f64).floor() as usize;
        out.swap(i, j);
    }
    out
}
