// anonymizer/generator.rs: replacement string generation strategies
use once_cell::sync::OnceCell;
use rand::rngs::OsRng;
use rand::RngCore;

use super::rules::Strategy;
use crate::error::Result;

pub const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-";

// Largest multiple of the alphabet size that fits in a byte; bytes above it are redrawn.
const REJECT_AT: u8 = (256 / ALPHABET.len() * ALPHABET.len()) as u8;

pub const PEPPER_LEN: usize = 32;

static PROCESS_PEPPER: OnceCell<[u8; PEPPER_LEN]> = OnceCell::new();

/// Produces a replacement of exactly `len` characters from `ALPHABET`.
pub trait ValueGenerator {
    fn generate(&self, raw: &str, len: usize) -> Result<String>;
}

/// Fresh CSPRNG output on every call; `raw` is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomGenerator;

impl ValueGenerator for RandomGenerator {
    fn generate(&self, _raw: &str, len: usize) -> Result<String> {
        let mut out = String::with_capacity(len);
        let mut buf = [0u8; 64];
        while out.len() < len {
            OsRng.try_fill_bytes(&mut buf)?;
            for &b in buf.iter().filter(|&&b| b < REJECT_AT) {
                if out.len() == len {
                    break;
                }
                out.push(ALPHABET[b as usize % ALPHABET.len()] as char);
            }
        }
        Ok(out)
    }
}

/// BLAKE3 keyed with a pepper, read through its extendable output.
/// The same raw value and length always give the same replacement.
#[derive(Clone)]
pub struct KeyedHashGenerator {
    pepper: [u8; PEPPER_LEN],
}

impl KeyedHashGenerator {
    /// Uses the pepper drawn once per process.
    pub fn from_process_pepper() -> Result<Self> {
        let pepper = PROCESS_PEPPER.get_or_try_init(|| {
            let mut p = [0u8; PEPPER_LEN];
            OsRng.try_fill_bytes(&mut p)?;
            Ok::<_, crate::error::ScrubError>(p)
        })?;
        Ok(Self { pepper: *pepper })
    }

    pub fn with_pepper(pepper: [u8; PEPPER_LEN]) -> Self {
        Self { pepper }
    }
}

impl ValueGenerator for KeyedHashGenerator {
    fn generate(&self, raw: &str, len: usize) -> Result<String> {
        let mut hasher = blake3::Hasher::new_keyed(&self.pepper);
        hasher.update(raw.as_bytes());
        let mut xof = hasher.finalize_xof();
        let mut out = String::with_capacity(len);
        let mut buf = [0u8; 64];
        while out.len() < len {
            xof.fill(&mut buf);
            for &b in buf.iter().filter(|&&b| b < REJECT_AT) {
                if out.len() == len {
                    break;
                }
                out.push(ALPHABET[b as usize % ALPHABET.len()] as char);
            }
        }
        Ok(out)
    }
}

impl std::fmt::Debug for KeyedHashGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedHashGenerator").finish_non_exhaustive()
    }
}

pub fn generator_for(strategy: Strategy) -> Result<Box<dyn ValueGenerator>> {
    Ok(match strategy {
        Strategy::Random => Box::new(RandomGenerator),
        Strategy::KeyedHash => Box::new(KeyedHashGenerator::from_process_pepper()?),
    })
}
