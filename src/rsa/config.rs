use lazy_static::lazy_static;
use num_cpus;
use crate::RSA;

lazy_static! {
    pub static ref CONFIG_DEF: RSA = RSA {
        mode: String::from("test"),
        input: String::from("stdin"),
        output: String::from("stdout"),
        user: String::from("rsa-user"),
        password: String::from(""),
        bits: 512,
        hash: String::from("sha256"),
        entropy: String::from("os"),
        seed: None,
        exponent: String::from(""),
        modulus: String::from(""),
        key_type: String::from("auto"),
        signature: String::from(""),
        rounds: 1000,
        draws: 10_000,
        nudges: 100_000,
        time_max: 60_000,
        threads: num_cpus::get(),
        samples: 8,
        silent: false,
    };
}
