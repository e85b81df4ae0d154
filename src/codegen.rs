//! Retrieval code minting.
//!
//! A [`CodeSource`] produces random candidates; [`find_unique_code`] drives the
//! bounded search for one that no live item holds.

use crate::core::{CustodyError, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;

const DIGITS: &[u8] = b"0123456789";
/// Upper-case alphanumerics without 0/O, 1/I/L.
const UNAMBIGUOUS: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeAlphabet {
    #[default]
    Digits,
    Unambiguous,
}

impl CodeAlphabet {
    pub fn symbols(&self) -> &'static [u8] {
        match self {
            CodeAlphabet::Digits => DIGITS,
            CodeAlphabet::Unambiguous => UNAMBIGUOUS,
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        code.bytes().all(|b| self.symbols().contains(&b))
    }
}

impl FromStr for CodeAlphabet {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "digits" | "numeric" => Ok(Self::Digits),
            "unambiguous" | "alphanumeric" => Ok(Self::Unambiguous),
            other => Err(format!("unknown code alphabet '{}'", other)),
        }
    }
}

/// Source of candidate retrieval codes.
pub trait CodeSource: Send + Sync {
    fn generate(&self, length: usize) -> Result<String>;
}

/// Draws codes uniformly from an alphabet using the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsCodeSource {
    alphabet: CodeAlphabet,
}

impl OsCodeSource {
    pub fn new(alphabet: CodeAlphabet) -> Self {
        Self { alphabet }
    }

    pub fn alphabet(&self) -> CodeAlphabet {
        self.alphabet
    }
}

impl CodeSource for OsCodeSource {
    fn generate(&self, length: usize) -> Result<String> {
        generate_code(&mut OsRng, self.alphabet, length)
    }
}

/// Generates `length` symbols from `alphabet`.
///
/// Bytes at or above the largest multiple of the alphabet size are rejected so
/// every symbol is equally likely.
pub fn generate_code<R: RngCore>(rng: &mut R, alphabet: CodeAlphabet, length: usize) -> Result<String> {
    if length == 0 {
        return Err(CustodyError::invalid("code_length", "must be greater than 0"));
    }

    let symbols = alphabet.symbols();
    let limit = 256 - (256 % symbols.len());
    let mut code = String::with_capacity(length);
    let mut buf = [0u8; 16];

    while code.len() < length {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| CustodyError::Randomness(e.to_string()))?;
        for byte in buf {
            if (byte as usize) < limit {
                code.push(symbols[byte as usize % symbols.len()] as char);
                if code.len() == length {
                    break;
                }
            }
        }
    }

    Ok(code)
}

/// Outcome of a bounded code search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeSearch<T = String> {
    Code(T),
    Exhausted { attempts: usize },
}

impl<T> CodeSearch<T> {
    pub fn into_result(self) -> Result<T> {
        match self {
            CodeSearch::Code(value) => Ok(value),
            CodeSearch::Exhausted { attempts } => Err(CustodyError::CodeExhausted { attempts }),
        }
    }
}

/// Tries up to `max_attempts` candidates from `generate`, returning the first
/// one `exists` reports as free.
///
/// Errors from either closure abort the search immediately.
pub async fn find_unique_code<G, E, Fut>(
    max_attempts: usize,
    generate: G,
    mut exists: E,
) -> Result<CodeSearch>
where
    G: FnMut() -> Result<String>,
    E: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    claim_unique_code(max_attempts, generate, move |candidate| {
        let taken = exists(candidate.clone());
        async move {
            let taken = taken.await?;
            Ok::<_, CustodyError>((!taken).then_some(candidate))
        }
    })
    .await
}

/// Hands up to `max_attempts` candidates to `claim` and returns what the first
/// successful claim produced.
///
/// `claim` answers `None` when the candidate is already held, whether it saw
/// that before writing or was beaten to it at commit. Both count against the
/// same budget.
pub async fn claim_unique_code<T, G, C, Fut>(
    max_attempts: usize,
    mut generate: G,
    mut claim: C,
) -> Result<CodeSearch<T>>
where
    G: FnMut() -> Result<String>,
    C: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for _ in 0..max_attempts {
        let candidate = generate()?;
        if let Some(claimed) = claim(candidate).await? {
            return Ok(CodeSearch::Code(claimed));
        }
    }
    Ok(CodeSearch::Exhausted {
        attempts: max_attempts,
    })
}
