use std::thread;
use std::time::Duration;
use chrono::Local;
use num_bigint::BigInt;
use num_traits::Signed;
use num::Integer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::rsa::hashes::HashAlgorithm;

/// Source of the random decimal material key generation and encryption draw from.
pub trait EntropySource {
    /// Uniform in `[low, high)`.
    fn next_index(&mut self, low: usize, high: usize) -> usize;

    /// Exactly `len` decimal digits, leading zeros allowed.
    fn next_digits(&mut self, len: usize) -> String;

    /// Independent stream for another worker.
    fn fork(&mut self) -> Self where Self: Sized;

    fn next_digit(&mut self) -> u8 {
        self.next_index(0, 10) as u8
    }

    fn next_odd_integer(&mut self, len: usize) -> BigInt {
        let digits = self.next_digits(len.max(1));
        let mut n = digits.parse::<BigInt>().map(|n| n.abs()).unwrap_or_default();
        if n.is_even() { n += 1u32; }
        n
    }
}

/// Plain generator backed entropy. `from_entropy` seeds from the OS.
pub struct RngEntropy {
    rng: StdRng,
}

impl RngEntropy {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl EntropySource for RngEntropy {
    fn next_index(&mut self, low: usize, high: usize) -> usize {
        if high <= low { low } else { self.rng.gen_range(low..high) }
    }

    fn next_digits(&mut self, len: usize) -> String {
        (0..len).map(|_| char::from(b'0' + self.rng.gen_range(0..10u8))).collect()
    }

    fn fork(&mut self) -> Self {
        Self { rng: StdRng::seed_from_u64(self.rng.gen()) }
    }
}

/// Mixes digests of two pointer-like anchors and the wall clock millisecond,
/// picked and scaled by a weak generator. Not cryptographically secure.
pub struct ClockEntropy {
    rng: StdRng,
    pointer: (i64, i64),
    digest: HashAlgorithm,
    delay: Duration,
}

pub const CLOCK_DRAW_DELAY: Duration = Duration::from_millis(10);

impl Default for ClockEntropy {
    fn default() -> Self {
        let mut rng = StdRng::from_entropy();
        let pointer = (rng.gen_range(0..4096), rng.gen_range(0..4096));
        Self { rng, pointer, digest: HashAlgorithm::default(), delay: CLOCK_DRAW_DELAY }
    }
}

impl ClockEntropy {
    pub fn with_pointer(x: i64, y: i64) -> Self {
        Self { pointer: (x, y), ..Self::default() }
    }

    pub fn digest(mut self, digest: HashAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl EntropySource for ClockEntropy {
    fn next_index(&mut self, low: usize, high: usize) -> usize {
        if high <= low { low } else { self.rng.gen_range(low..high) }
    }

    fn next_digits(&mut self, len: usize) -> String {
        let millis = Local::now().timestamp_subsec_millis();
        let sources = [
            self.digest.compute_text(&self.pointer.0.to_string()),
            self.digest.compute_text(&self.pointer.1.to_string()),
            self.digest.compute_text(&millis.to_string()),
        ];
        let mut res = String::with_capacity(len);
        for _ in 0..len {
            let source = &sources[self.rng.gen_range(0..sources.len())];
            let byte = source[self.rng.gen_range(0..source.len())] as u32;
            let scaled = (byte * self.rng.gen_range(0..8u32)).to_string();
            res.push(scaled.chars().next().unwrap_or('0'));
        }
        if !self.delay.is_zero() { thread::sleep(self.delay); }
        res
    }

    fn fork(&mut self) -> Self {
        Self {
            rng: StdRng::seed_from_u64(self.rng.gen()),
            pointer: (self.pointer.1, self.pointer.0 ^ self.rng.gen_range(1..4096)),
            digest: self.digest,
            delay: self.delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use num::Integer;
    use crate::rsa::entropy::{ClockEntropy, EntropySource, RngEntropy};

    #[test]
    fn test_seeded_is_deterministic() {
        let (mut a, mut b) = (RngEntropy::seeded(7), RngEntropy::seeded(7));
        assert_eq!(a.next_digits(40), b.next_digits(40));
        assert_eq!(a.next_odd_integer(20), b.next_odd_integer(20));
        let (mut fa, mut fb) = (a.fork(), b.fork());
        assert_eq!(fa.next_digits(40), fb.next_digits(40));
        assert_ne!(fa.next_digits(40), a.next_digits(40));
    }

    #[test]
    fn test_odd_integer() {
        let mut entropy = RngEntropy::seeded(1);
        for _ in 0..100 {
            let n = entropy.next_odd_integer(12);
            assert!(n.is_odd());
            assert!(n.to_string().len() <= 12);
        }
    }

    #[test]
    fn test_clock_digits() {
        let mut entropy = ClockEntropy::with_pointer(640, 480).delay(Duration::ZERO);
        let digits = entropy.next_digits(64);
        assert_eq!(digits.len(), 64);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        assert!(entropy.next_odd_integer(30).is_odd());
        assert!(entropy.next_digit() < 10);
    }
}
