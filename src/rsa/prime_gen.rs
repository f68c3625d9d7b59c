use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use chrono::Local;
use log::{debug, trace};
use num::Integer;
use num_bigint::BigInt;
use num_traits::{One, Zero};
use crate::rsa::codec::decimal_digits;
use crate::rsa::entropy::EntropySource;
use crate::rsa::error::{RsaError, Stage};

/// Trial division bound shared by the primality prefilter and the nudge step.
pub const SMALL_FACTOR_BOUND: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_prime_draws: usize,
    pub max_nudges: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self { max_prime_draws: 10_000, max_nudges: 100_000 }
    }
}

/// Shared flag a caller flips to stop a running generation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deadline and cancellation checked between candidate draws.
#[derive(Debug, Clone)]
pub struct Control {
    start: i64,
    time_max: i64,
    cancel: CancelToken,
    // stops sibling workers without touching the caller's token
    halt: CancelToken,
}

impl Control {
    /// `time_max` in ms, `0` disables the deadline.
    pub fn new(time_max: i64, cancel: CancelToken) -> Self {
        Self { start: Local::now().timestamp_millis(), time_max, cancel, halt: CancelToken::new() }
    }

    /// Same deadline and caller token, with a fresh halt flag for one batch of workers.
    pub fn scoped(&self) -> Self {
        Self { halt: CancelToken::new(), ..self.clone() }
    }

    pub fn halt(&self) {
        self.halt.cancel();
    }

    pub fn elapsed(&self) -> i64 {
        Local::now().timestamp_millis() - self.start
    }

    pub fn check(&self) -> Result<(), RsaError> {
        if self.cancel.is_cancelled() || self.halt.is_cancelled() { return Err(RsaError::Cancelled); }
        let time = self.elapsed();
        if self.time_max > 0 && time > self.time_max {
            return Err(RsaError::Timeout(time));
        }
        Ok(())
    }
}

/// Smallest divisor of `n` in `[2, 256]`, never `n` itself.
pub fn small_factor(n: &BigInt) -> Option<u32> {
    (2..=SMALL_FACTOR_BOUND)
        .take_while(|d| BigInt::from(*d) < *n)
        .find(|d| (n % *d).is_zero())
}

pub fn is_probable_prime<E: EntropySource>(n: &BigInt, entropy: &mut E) -> bool {
    let two = BigInt::from(2u32);
    if *n < two { return false; }
    if *n == two { return true; }
    if n.is_even() || small_factor(n).is_some() { return false; }
    // composites this small always have a factor below the bound
    if *n <= BigInt::from(SMALL_FACTOR_BOUND * SMALL_FACTOR_BOUND) { return true; }
    miller_rabin(n, entropy)
}

/// One round per decimal digit of `n`, witnesses drawn as decimal strings of
/// `[2, digits(n) - 2)` digits.
fn miller_rabin<E: EntropySource>(n: &BigInt, entropy: &mut E) -> bool {
    let two = BigInt::from(2u32);
    let n_minus_one = n - BigInt::one();
    let witness_max = n - &two;
    let witness_span = n - BigInt::from(3u32);
    let mut t = n_minus_one.clone();
    let mut s = 0usize;
    while t.is_even() {
        t >>= 1;
        s += 1;
    }
    let digits = decimal_digits(n);
    for _ in 0..digits {
        let len = entropy.next_index(2, digits.saturating_sub(2)).max(2);
        let mut witness = entropy.next_digits(len).parse::<BigInt>().unwrap_or_default();
        if witness < two || witness > witness_max {
            witness = &two + witness.mod_floor(&witness_span);
        }
        let mut x = witness.modpow(&t, n);
        if x.is_one() || x == n_minus_one { continue; }
        let mut pass = false;
        for _ in 0..s.saturating_sub(1) {
            x = x.modpow(&two, n);
            if x.is_one() { return false; }
            if x == n_minus_one {
                pass = true;
                break;
            }
        }
        if !pass { return false; }
    }
    true
}

fn has_small_divisor(n: &BigInt) -> bool {
    (2..=SMALL_FACTOR_BOUND).any(|d| (n % d).is_zero())
}

/// Steps `candidate` forward until nothing in `[2, 256]` divides it, the
/// candidate itself included, so the result is always above 256.
pub fn nudge(mut candidate: BigInt, max_nudges: usize) -> Result<BigInt, RsaError> {
    let mut nudges = 0;
    while has_small_divisor(&candidate) {
        if nudges >= max_nudges {
            return Err(RsaError::KeyGenerationExhausted { stage: Stage::Nudging, attempts: nudges });
        }
        candidate += BigInt::one();
        nudges += 1;
    }
    Ok(candidate)
}

/// Redraws and nudges until `initial` is replaced by a probable prime of about
/// `digits` decimal digits. `initial` itself is tested un-nudged first.
pub fn search_prime<E: EntropySource>(
    initial: BigInt, digits: usize, entropy: &mut E, limits: &SearchLimits, control: &Control,
) -> Result<BigInt, RsaError> {
    let mut candidate = initial;
    let mut draws = 0;
    while !is_probable_prime(&candidate, entropy) {
        control.check()?;
        if draws >= limits.max_prime_draws {
            debug!("Failed prime search in {} tries after {} ms", draws, control.elapsed());
            return Err(RsaError::KeyGenerationExhausted { stage: Stage::PrimeSearch, attempts: draws });
        }
        draws += 1;
        candidate = nudge(entropy.next_odd_integer(digits), limits.max_nudges)?;
    }
    trace!("Done prime search in {} tries after {} ms", draws, control.elapsed());
    Ok(candidate)
}
