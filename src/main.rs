use std::error::Error;
use clap::Parser;
use log::{debug, LevelFilter};
use rsa_crypt::RSA;

fn main() -> Result<(), Box<dyn Error>> {
    let mut rsa = RSA::parse();
    env_logger::builder()
        .filter_level(if rsa.silent { LevelFilter::Off } else { LevelFilter::Info })
        .parse_default_env()
        .init();
    debug!("Run args: mode {}, bits {}, hash {}, threads {}", rsa.mode, rsa.bits, rsa.hash, rsa.threads);
    rsa.run()?;
    Ok(())
}
