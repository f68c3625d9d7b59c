use std::thread;
use crossbeam_channel::bounded;
use log::{debug, info};
use num::Integer;
use num_bigint::BigInt;
use num_traits::{One, Signed};
use crate::rsa::entropy::{EntropySource, RngEntropy};
use crate::rsa::error::{RsaError, Stage};
use crate::rsa::euclid::modular_inverse;
use crate::rsa::hashes::HashAlgorithm;
use crate::rsa::keys::key_data::{KeyOrigin, PrivateKey, PublicKey};
use crate::rsa::prime_gen::{search_prime, CancelToken, Control, SearchLimits};

pub const MIN_BIT_LENGTH: u32 = 16;

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

/// Everything a successful round produced; only `e`, `d` and `modulus` outlive generation.
#[derive(Debug, Clone)]
pub(crate) struct KeyMaterial {
    #[cfg_attr(not(test), allow(dead_code))]
    pub p: BigInt,
    #[cfg_attr(not(test), allow(dead_code))]
    pub q: BigInt,
    pub e: BigInt,
    pub d: BigInt,
    pub modulus: BigInt,
    #[cfg_attr(not(test), allow(dead_code))]
    pub totient: BigInt,
}

impl KeyMaterial {
    fn into_pair(self, origin: KeyOrigin) -> KeyPair {
        KeyPair {
            public: PublicKey::new(self.e, self.modulus.clone(), origin.clone()),
            private: PrivateKey::new(self.d, self.modulus, origin),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyPairGenerator {
    pub bit_length: u32,
    pub digest: HashAlgorithm,
    /// Candidate sets tried before giving up on the `(d * e) % f == 1` check.
    pub max_rounds: usize,
    pub limits: SearchLimits,
    /// `p`, `q` and `e` are searched on their own threads when above 1.
    pub threads: usize,
    /// ms, 0 for none
    pub time_max: i64,
    pub cancel: CancelToken,
}

impl Default for KeyPairGenerator {
    fn default() -> Self {
        Self {
            bit_length: 512,
            digest: HashAlgorithm::default(),
            max_rounds: 1000,
            limits: SearchLimits::default(),
            threads: 1,
            time_max: 0,
            cancel: CancelToken::new(),
        }
    }
}

pub fn generate_pair(username: &str, password: &str, bit_length: u32) -> Result<KeyPair, RsaError> {
    KeyPairGenerator::new(bit_length).generate(username, password, &mut RngEntropy::from_entropy())
}

impl KeyPairGenerator {
    pub fn new(bit_length: u32) -> Self {
        Self { bit_length, ..Self::default() }
    }

    /// Decimal digits drawn per candidate.
    pub fn digit_length(&self) -> usize {
        (self.bit_length / 8) as usize
    }

    pub fn generate<E>(&self, username: &str, password: &str, entropy: &mut E) -> Result<KeyPair, RsaError>
        where E: EntropySource + Send + 'static {
        let material = self.search_material(entropy)?;
        Ok(material.into_pair(KeyOrigin::new(username, password, self.digest)))
    }

    pub(crate) fn search_material<E>(&self, entropy: &mut E) -> Result<KeyMaterial, RsaError>
        where E: EntropySource + Send + 'static {
        if self.bit_length < MIN_BIT_LENGTH {
            return Err(RsaError::InvalidBitLength { bits: self.bit_length, min: MIN_BIT_LENGTH });
        }
        let digits = self.digit_length();
        let control = Control::new(self.time_max, self.cancel.clone());
        for round in 1..=self.max_rounds {
            control.check()?;
            let candidates = [
                entropy.next_odd_integer(digits),
                entropy.next_odd_integer(digits),
                entropy.next_odd_integer(digits),
            ];
            let [p, q, e] = self.search_primes(candidates, digits, entropy, &control)?;
            if p == q {
                debug!("Round {} rejected: p == q", round);
                continue;
            }
            let modulus = &p * &q;
            let totient = (&p - BigInt::one()) * (&q - BigInt::one());
            let d = modular_inverse(&e, &totient).abs();
            if (&d * &e).mod_floor(&totient).is_one() {
                info!("Done generation in {} rounds after {} ms", round, control.elapsed());
                return Ok(KeyMaterial { p, q, e, d, modulus, totient });
            }
            debug!("Round {} rejected: (d * e) % f != 1", round);
        }
        info!("Failed generation in {} rounds after {} ms", self.max_rounds, control.elapsed());
        Err(RsaError::KeyGenerationExhausted { stage: Stage::Verification, attempts: self.max_rounds })
    }

    fn search_primes<E>(&self, candidates: [BigInt; 3], digits: usize, entropy: &mut E, control: &Control)
        -> Result<[BigInt; 3], RsaError> where E: EntropySource + Send + 'static {
        if self.threads <= 1 {
            let [p, q, e] = candidates;
            return Ok([
                search_prime(p, digits, entropy, &self.limits, control)?,
                search_prime(q, digits, entropy, &self.limits, control)?,
                search_prime(e, digits, entropy, &self.limits, control)?,
            ]);
        }
        let control = control.scoped();
        let (tx, rx) = bounded(candidates.len());
        let handles = candidates.into_iter().enumerate().map(|(slot, initial)| {
            let tx = tx.clone();
            let mut stream = entropy.fork();
            let (limits, control) = (self.limits, control.clone());
            thread::spawn(move || {
                let res = search_prime(initial, digits, &mut stream, &limits, &control);
                if res.is_err() { control.halt(); }
                // the receiver outlives every worker
                let _ = tx.send((slot, res));
            })
        }).collect::<Vec<_>>();
        drop(tx);
        let mut found: [Option<BigInt>; 3] = Default::default();
        let mut failure: Option<RsaError> = None;
        for (slot, res) in rx.iter() {
            match res {
                Ok(prime) => found[slot] = Some(prime),
                // a halted sibling reports Cancelled, keep the error that caused it
                Err(e) => if matches!(failure, None | Some(RsaError::Cancelled)) { failure = Some(e) },
            }
        }
        for handle in handles {
            if handle.join().is_err() {
                failure.get_or_insert_with(|| RsaError::WorkerFailed("prime search panicked".to_string()));
            }
        }
        if let Some(e) = failure { return Err(e); }
        match found {
            [Some(p), Some(q), Some(e)] => Ok([p, q, e]),
            _ => Err(RsaError::WorkerFailed("prime search ended without a result".to_string())),
        }
    }
}
