use std::error::Error;
use std::fs::File;
use std::io;
use std::io::{Read, Write};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use num_bigint::BigInt;

pub mod codec;
pub mod config;
pub mod entropy;
pub mod error;
pub mod euclid;
pub mod hashes;
pub mod keys;
pub mod prime_gen;

use config::*;
use entropy::*;
use error::*;
use hashes::*;
use keys::*;
use prime_gen::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Generate,
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    Test,
}

#[macro_export]
macro_rules! rsa_t {
    ($CONFIG: expr, $NAME: ident) => {
#[derive(Debug, Parser)]
pub struct $NAME {
    #[clap(short, long, value_parser, default_value = $CONFIG.mode.as_str(), help = "Run mode: generate, encrypt, decrypt, sign, verify, test")]
    pub mode: String,
    #[clap(short, long, value_parser, default_value = $CONFIG.input.as_str(), help = "Input filename")]
    pub input: String,
    #[clap(short, long, value_parser, default_value = $CONFIG.output.as_str(), help = "Output filename")]
    pub output: String,
    #[clap(short, long, value_parser, default_value = $CONFIG.user.as_str(), help = "Key owner")]
    pub user: String,
    #[clap(short, long, value_parser, default_value = $CONFIG.password.as_str(), help = "Password hashed into the key")]
    pub password: String,
    #[clap(short, long, value_parser, default_value_t = $CONFIG.bits, help = "Key bit length, candidates get <BITS>/8 decimal digits")]
    pub bits: u32,
    #[clap(long, value_parser, default_value = $CONFIG.hash.as_str(), help = "Hash algorithm: sha256, sha512, md5")]
    pub hash: String,
    #[clap(long, value_parser, default_value = $CONFIG.entropy.as_str(), help = "Entropy source: os, clock")]
    pub entropy: String,
    #[clap(long, value_parser, help = "Seed a deterministic entropy source")]
    pub seed: Option<u64>,
    #[clap(short, long, value_parser, default_value = $CONFIG.exponent.as_str(), help = "Key exponent in decimal")]
    pub exponent: String,
    #[clap(short = 'n', long, value_parser, default_value = $CONFIG.modulus.as_str(), help = "Key modulus in decimal")]
    pub modulus: String,
    #[clap(short, long, value_parser, default_value = $CONFIG.key_type.as_str(), help = "Key type: auto, public, private")]
    pub key_type: String,
    #[clap(long, value_parser, default_value = $CONFIG.signature.as_str(), help = "Signature to verify")]
    pub signature: String,
    #[clap(short, long, value_parser, default_value_t = $CONFIG.rounds, help = "Max candidate sets tried during generation")]
    pub rounds: usize,
    #[clap(long, value_parser, default_value_t = $CONFIG.draws, help = "Max redraws while searching one prime")]
    pub draws: usize,
    #[clap(long, value_parser, default_value_t = $CONFIG.nudges, help = "Max increments while skipping small factors")]
    pub nudges: usize,
    #[clap(long, value_parser, default_value_t = $CONFIG.time_max, help = "Max time in mill seconds for a generation, 0 for none")]
    pub time_max: i64,
    #[clap(short, long, value_parser, default_value_t = $CONFIG.threads, help = "Search primes in <THREADS> threads")]
    pub threads: usize,
    #[clap(long, value_parser, default_value_t = $CONFIG.samples, help = "Random samples checked in test mode")]
    pub samples: usize,
    #[clap(short, long, value_parser, default_value_t = $CONFIG.silent, help = "Disable log output")]
    pub silent: bool,
}
    };
}

rsa_t!(CONFIG_DEF, RSA);

impl RSA {
    pub fn copy(&self) -> RSA {
        RSA {
            mode: self.mode.clone(),
            input: self.input.clone(),
            output: self.output.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            bits: self.bits,
            hash: self.hash.clone(),
            entropy: self.entropy.clone(),
            seed: self.seed,
            exponent: self.exponent.clone(),
            modulus: self.modulus.clone(),
            key_type: self.key_type.clone(),
            signature: self.signature.clone(),
            rounds: self.rounds,
            draws: self.draws,
            nudges: self.nudges,
            time_max: self.time_max,
            threads: self.threads,
            samples: self.samples,
            silent: self.silent,
        }
    }

    pub fn reader(&self) -> io::Result<Box<dyn Read>> {
        Ok(match self.input.as_str() {
            "stdin" => Box::new(io::stdin()),
            f => Box::new(File::open(f)?)
        })
    }

    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        Ok(match self.output.as_str() {
            "stdout" => Box::new(io::stdout()),
            f => Box::new(File::create(f)?)
        })
    }

    fn read_input(&self) -> io::Result<String> {
        let mut text = String::new();
        self.reader()?.read_to_string(&mut text)?;
        Ok(text)
    }

    pub fn run_mode(&self) -> Result<RunMode, RsaError> {
        match self.mode.as_str() {
            "generate" => Ok(RunMode::Generate),
            "encrypt" | "encode" => Ok(RunMode::Encrypt),
            "decrypt" | "decode" => Ok(RunMode::Decrypt),
            "sign" => Ok(RunMode::Sign),
            "verify" => Ok(RunMode::Verify),
            "test" => Ok(RunMode::Test),
            m => Err(RsaError::UnknownMode(m.to_string())),
        }
    }

    pub fn digest(&self) -> Result<HashAlgorithm, RsaError> {
        self.hash.parse()
    }

    pub fn generator(&self) -> Result<KeyPairGenerator, RsaError> {
        Ok(KeyPairGenerator {
            bit_length: self.bits,
            digest: self.digest()?,
            max_rounds: self.rounds,
            limits: SearchLimits { max_prime_draws: self.draws, max_nudges: self.nudges },
            threads: self.threads,
            time_max: self.time_max,
            cancel: CancelToken::new(),
        })
    }

    pub fn generate_key(&self) -> Result<KeyPair, RsaError> {
        let generator = self.generator()?;
        let (user, password) = (self.user.as_str(), self.password.as_str());
        match (self.entropy.as_str(), self.seed) {
            (_, Some(seed)) => generator.generate(user, password, &mut RngEntropy::seeded(seed)),
            ("os", None) => generator.generate(user, password, &mut RngEntropy::from_entropy()),
            ("clock", None) => generator.generate(user, password, &mut ClockEntropy::default().digest(generator.digest)),
            (e, None) => Err(RsaError::UnknownEntropy(e.to_string())),
        }
    }

    /// Type a key given on the command line; `auto` picks what `mode` needs.
    pub fn key_type_for(&self, mode: RunMode) -> Result<KeyType, RsaError> {
        match (self.key_type.as_str(), mode) {
            ("auto", RunMode::Decrypt | RunMode::Sign) => Ok(KeyType::Private),
            ("auto", _) => Ok(KeyType::Public),
            (t, _) => t.parse(),
        }
    }

    pub fn key(&self, mode: RunMode) -> Result<Key, RsaError> {
        let parse = |name: &str, value: &str| value.trim().parse::<BigInt>()
            .map_err(|_| RsaError::MalformedKey(format!("{} `{}` is not a decimal integer", name, value)));
        Key::from_parts(
            parse("exponent", &self.exponent)?,
            parse("modulus", &self.modulus)?,
            self.key_type_for(mode)?,
            KeyOrigin::new(&self.user, &self.password, self.digest()?),
        )
    }

    fn sample_texts(&self) -> Result<Vec<String>, Box<dyn Error>> {
        if self.input != "stdin" { return Ok(vec![self.read_input()?]); }
        let mut entropy = match self.seed {
            Some(seed) => RngEntropy::seeded(seed ^ 0x5eed),
            None => RngEntropy::from_entropy(),
        };
        Ok((0..self.samples).map(|_| {
            let len = entropy.next_index(1, 300);
            (0..len).map(|_| char::from(entropy.next_index(0x20, 0x7f) as u8)).collect()
        }).collect())
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        let mode = self.run_mode()?;
        debug!("Run mode: {:?}", mode);
        match mode {
            RunMode::Generate => {
                let key_pair = self.generate_key()?;
                let mut writer = self.writer()?;
                let origin = key_pair.public.origin();
                writeln!(writer, "owner: {}", origin.owner)?;
                writeln!(writer, "hash: {}", origin.digest)?;
                writeln!(writer, "password hash: {}", base64::encode(&origin.password_hash))?;
                writeln!(writer, "modulus: {}", key_pair.public.modulus())?;
                writeln!(writer, "public exponent: {}", key_pair.public.exponent())?;
                writeln!(writer, "private exponent: {}", key_pair.private.exponent())?;
                writer.flush()?;
            }
            RunMode::Encrypt => {
                let ciphertext = self.key(mode)?.encrypt(&self.read_input()?)?;
                let mut writer = self.writer()?;
                writeln!(writer, "{}", ciphertext)?;
                writer.flush()?;
            }
            RunMode::Decrypt => {
                let plaintext = self.key(mode)?.decrypt(&self.read_input()?)?;
                let mut writer = self.writer()?;
                writer.write_all(plaintext.as_bytes())?;
                writer.flush()?;
            }
            RunMode::Sign => {
                let signature = self.key(mode)?.sign(&self.read_input()?)?;
                let mut writer = self.writer()?;
                writeln!(writer, "{}", signature)?;
                writer.flush()?;
            }
            RunMode::Verify => {
                let valid = self.key(mode)?.check_signature(&self.read_input()?, &self.signature)?;
                let mut writer = self.writer()?;
                writeln!(writer, "{}", if valid { "Signature valid" } else { "Signature invalid" })?;
                writer.flush()?;
                if !valid { return Err("signature check failed".into()); }
            }
            RunMode::Test => {
                let key_pair = self.generate_key()?;
                let samples = self.sample_texts()?;
                info!("Testing {} samples against a {} digit modulus", samples.len(), codec::decimal_digits(key_pair.public.modulus()));
                let pb = match self.silent {
                    true => None,
                    false => Some(ProgressBar::new(samples.len() as u64)),
                };
                if let Some(pb) = &pb {
                    pb.set_style(ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")?
                        .progress_chars("#>-"));
                }
                let mut entropy = RngEntropy::from_entropy();
                for (i, text) in samples.iter().enumerate() {
                    let ciphertext = key_pair.public.encrypt_with(text, &mut entropy)?;
                    if key_pair.private.decrypt(&ciphertext)? != *text {
                        return Err(format!("Round trip mismatch on sample {}", i).into());
                    }
                    if !key_pair.public.check_signature(text, &key_pair.private.sign(text))? {
                        return Err(format!("Signature rejected on sample {}", i).into());
                    }
                    if let Some(pb) = &pb {
                        pb.inc(1);
                    }
                }
                if let Some(pb) = &pb {
                    pb.finish_with_message("Test pass");
                }
                info!("Test pass");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::fs;
    use crate::rsa::config::CONFIG_DEF;
    use crate::rsa::error::RsaError;
    use crate::rsa::keys::KeyType;
    use crate::{RunMode, RSA};

    fn config(mode: &str) -> RSA {
        let mut rsa = CONFIG_DEF.copy();
        rsa.mode = mode.to_string();
        rsa.bits = 128;
        rsa.seed = Some(2022);
        rsa.silent = true;
        rsa
    }

    fn temp_path(name: &str) -> String {
        std::env::temp_dir().join(format!("rsa-crypt-{}-{}", std::process::id(), name)).display().to_string()
    }

    #[test]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let rsa = CONFIG_DEF.copy();
        assert_eq!(rsa.run_mode()?, RunMode::Test);
        assert_eq!(rsa.generator()?.digit_length(), 64);
        assert!(rsa.threads >= 1);
        assert!(matches!(config("explode").run_mode(), Err(RsaError::UnknownMode(_))));
        Ok(())
    }

    #[test]
    fn test_key_type_resolution() -> Result<(), Box<dyn Error>> {
        let mut rsa = config("encrypt");
        assert_eq!(rsa.key_type_for(RunMode::Encrypt)?, KeyType::Public);
        assert_eq!(rsa.key_type_for(RunMode::Verify)?, KeyType::Public);
        assert_eq!(rsa.key_type_for(RunMode::Decrypt)?, KeyType::Private);
        assert_eq!(rsa.key_type_for(RunMode::Sign)?, KeyType::Private);
        rsa.key_type = "private".to_string();
        assert_eq!(rsa.key_type_for(RunMode::Encrypt)?, KeyType::Private);
        Ok(())
    }

    #[test]
    fn test_cli_key_mismatch() -> Result<(), Box<dyn Error>> {
        let pair = config("generate").generate_key()?;
        let mut rsa = config("encrypt");
        rsa.exponent = pair.private.exponent().to_string();
        rsa.modulus = pair.private.modulus().to_string();
        rsa.key_type = "private".to_string();
        let key = rsa.key(RunMode::Encrypt)?;
        assert!(matches!(key.encrypt("x"), Err(RsaError::KeyTypeMismatch { .. })));
        rsa.modulus = "12ab".to_string();
        assert!(matches!(rsa.key(RunMode::Encrypt), Err(RsaError::MalformedKey(_))));
        Ok(())
    }

    #[test]
    fn test_seeded_generate_matches() -> Result<(), Box<dyn Error>> {
        let (a, b) = (config("generate").generate_key()?, config("generate").generate_key()?);
        assert_eq!(a.public, b.public);
        let mut rsa = config("generate");
        rsa.entropy = "dice".to_string();
        rsa.seed = None;
        assert!(matches!(rsa.generate_key(), Err(RsaError::UnknownEntropy(_))));
        Ok(())
    }

    #[test]
    fn test_cli_round_trip() -> Result<(), Box<dyn Error>> {
        let pair = config("generate").generate_key()?;
        let (plain, cipher, back, sig) = (temp_path("plain"), temp_path("cipher"), temp_path("back"), temp_path("sig"));
        fs::write(&plain, "Hello from the command line")?;

        let mut rsa = config("encrypt");
        rsa.exponent = pair.public.exponent().to_string();
        rsa.modulus = pair.public.modulus().to_string();
        rsa.input = plain.clone();
        rsa.output = cipher.clone();
        rsa.run()?;

        let mut rsa = config("decrypt");
        rsa.exponent = pair.private.exponent().to_string();
        rsa.modulus = pair.private.modulus().to_string();
        rsa.input = cipher.clone();
        rsa.output = back.clone();
        rsa.run()?;
        assert_eq!(fs::read_to_string(&back)?, "Hello from the command line");

        rsa.mode = "sign".to_string();
        rsa.input = plain.clone();
        rsa.output = sig.clone();
        rsa.run()?;

        let mut rsa = config("verify");
        rsa.exponent = pair.public.exponent().to_string();
        rsa.modulus = pair.public.modulus().to_string();
        rsa.input = plain.clone();
        rsa.output = temp_path("verdict");
        rsa.signature = fs::read_to_string(&sig)?;
        rsa.run()?;
        assert_eq!(fs::read_to_string(&rsa.output)?.trim(), "Signature valid");

        for f in [plain, cipher, back, sig, rsa.output.clone()] {
            let _ = fs::remove_file(f);
        }
        Ok(())
    }

    #[test]
    fn test_self_test_mode() -> Result<(), Box<dyn Error>> {
        let mut rsa = config("test");
        rsa.samples = 4;
        rsa.run()?;
        Ok(())
    }
}
