use crate::codegen::CodeAlphabet;
use crate::core::{CustodyError, Result};
use anyhow::Context;
use std::time::Duration;

pub const MIN_CODE_LENGTH: usize = 6;
pub const MAX_CODE_LENGTH: usize = 8;

/// Which lookup cache the engine is wired with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Disabled,
    InProcess { capacity: usize },
}

impl Default for CacheMode {
    fn default() -> Self {
        CacheMode::InProcess { capacity: 1024 }
    }
}

/// Custody engine configuration
#[derive(Debug, Clone)]
pub struct CustodyConfig {
    /// Retrieval code length, 6 to 8 symbols
    pub code_length: usize,

    pub code_alphabet: CodeAlphabet,

    /// Bound on the code minting search
    pub max_code_attempts: usize,

    pub cache: CacheMode,

    /// Lifetime of a cached code lookup
    pub cache_ttl: Duration,

    /// Prefix of the default QR path, followed by the code
    pub qr_prefix: String,

    /// bcrypt cost for staff passwords
    pub password_cost: u32,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            code_length: MIN_CODE_LENGTH,
            code_alphabet: CodeAlphabet::Digits,
            max_code_attempts: 5,
            cache: CacheMode::default(),
            cache_ttl: Duration::from_secs(60),
            qr_prefix: "/qr/".to_string(),
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl CustodyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    pub fn code_alphabet(mut self, alphabet: CodeAlphabet) -> Self {
        self.code_alphabet = alphabet;
        self
    }

    pub fn max_code_attempts(mut self, attempts: usize) -> Self {
        self.max_code_attempts = attempts;
        self
    }

    pub fn cache(mut self, mode: CacheMode) -> Self {
        self.cache = mode;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn qr_prefix(mut self, prefix: &str) -> Self {
        self.qr_prefix = prefix.to_string();
        self
    }

    pub fn password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    /// Default QR path for `code`
    pub fn default_qr_url(&self, code: &str) -> String {
        format!("{}{}", self.qr_prefix, code)
    }

    /// Reads `CUSTODY_*` variables from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from `lookup`, falling back to defaults for
    /// unset keys, then validates it.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("CUSTODY_CODE_LENGTH") {
            config.code_length = raw
                .parse::<usize>()
                .context("CUSTODY_CODE_LENGTH must be a positive integer")?;
        }
        if let Some(raw) = lookup("CUSTODY_CODE_ALPHABET") {
            config.code_alphabet = raw
                .parse::<CodeAlphabet>()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("CUSTODY_CODE_ALPHABET must be one of: digits, unambiguous")?;
        }
        if let Some(raw) = lookup("CUSTODY_CODE_ATTEMPTS") {
            config.max_code_attempts = raw
                .parse::<usize>()
                .context("CUSTODY_CODE_ATTEMPTS must be a positive integer")?;
        }

        let capacity = match lookup("CUSTODY_CACHE_CAPACITY") {
            Some(raw) => raw
                .parse::<usize>()
                .context("CUSTODY_CACHE_CAPACITY must be a positive integer")?,
            None => 1024,
        };
        if let Some(raw) = lookup("CUSTODY_CACHE") {
            config.cache = match raw.to_ascii_lowercase().as_str() {
                "off" | "none" | "disabled" | "false" => CacheMode::Disabled,
                "memory" | "lru" | "on" | "true" => CacheMode::InProcess { capacity },
                _ => anyhow::bail!("CUSTODY_CACHE must be one of: off, memory"),
            };
        } else {
            config.cache = CacheMode::InProcess { capacity };
        }

        if let Some(raw) = lookup("CUSTODY_CACHE_TTL_SECS") {
            let secs: u64 = raw
                .parse()
                .context("CUSTODY_CACHE_TTL_SECS must be a number of seconds")?;
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(prefix) = lookup("CUSTODY_QR_PREFIX") {
            config.qr_prefix = prefix;
        }
        if let Some(raw) = lookup("CUSTODY_PASSWORD_COST") {
            config.password_cost = raw
                .parse::<u32>()
                .context("CUSTODY_PASSWORD_COST must be a bcrypt cost between 4 and 31")?;
        }

        config.validate().context("invalid custody configuration")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.code_length) {
            return Err(CustodyError::Config(format!(
                "code_length must be between {} and {}, got {}",
                MIN_CODE_LENGTH, MAX_CODE_LENGTH, self.code_length
            )));
        }
        if self.max_code_attempts == 0 {
            return Err(CustodyError::Config("max_code_attempts must be > 0".to_string()));
        }
        if let CacheMode::InProcess { capacity: 0 } = self.cache {
            return Err(CustodyError::Config("cache capacity must be > 0".to_string()));
        }
        if self.cache_ttl.is_zero() && self.cache != CacheMode::Disabled {
            return Err(CustodyError::Config("cache_ttl must be > 0 when caching".to_string()));
        }
        if !(4..=31).contains(&self.password_cost) {
            return Err(CustodyError::Config(format!(
                "password_cost must be between 4 and 31, got {}",
                self.password_cost
            )));
        }
        Ok(())
    }
}
