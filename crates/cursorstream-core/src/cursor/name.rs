use crate::{config::CursorConfig, error::CursorError};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;

///
/// CursorName
///
/// A cursor identifier in both forms: the raw name as supplied or generated,
/// and the double-quoted SQL form that is safe to splice into statements.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CursorName {
    raw: String,
    quoted: String,
}

impl CursorName {
    /// Quote `raw` as a delimited identifier, doubling embedded quotes.
    pub fn quote(raw: &str, max_len: usize) -> Result<Self, CursorError> {
        if raw.is_empty() {
            return Err(CursorError::invalid_identifier(raw, "name is empty"));
        }
        if raw.contains('\0') {
            return Err(CursorError::invalid_identifier(raw, "name contains a NUL byte"));
        }
        if raw.len() > max_len {
            return Err(CursorError::invalid_identifier(
                raw,
                "name exceeds the identifier length limit",
            ));
        }

        let quoted = format!("\"{}\"", raw.replace('"', "\"\""));

        Ok(Self {
            raw: raw.to_string(),
            quoted,
        })
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The quoted form, ready for `DECLARE`/`FETCH`/`CLOSE`.
    #[must_use]
    pub fn as_sql(&self) -> &str {
        &self.quoted
    }
}

impl fmt::Display for CursorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted)
    }
}

///
/// CursorNameAllocator
///
/// Hands out cursor names. Generated names are `<prefix><random u64>`; they
/// are unique with overwhelming probability, not by construction. A
/// collision surfaces as a database error when the cursor is declared.
///

pub struct CursorNameAllocator {
    prefix: String,
    max_len: usize,
    rng: ChaCha8Rng,
}

impl CursorNameAllocator {
    /// Allocator seeded from OS entropy.
    #[must_use]
    pub fn new(config: &CursorConfig) -> Self {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    /// Deterministic allocator; two allocators with the same seed produce
    /// the same sequence of names.
    #[must_use]
    pub fn with_seed(config: &CursorConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: &CursorConfig, rng: ChaCha8Rng) -> Self {
        Self {
            prefix: config.name_prefix.clone(),
            max_len: config.max_identifier_len,
            rng,
        }
    }

    pub fn allocate(&mut self, explicit: Option<&str>) -> Result<CursorName, CursorError> {
        match explicit {
            Some(name) => CursorName::quote(name, self.max_len),
            None => {
                let raw = format!("{}{}", self.prefix, self.rng.next_u64());

                CursorName::quote(&raw, self.max_len)
            }
        }
    }
}

impl fmt::Debug for CursorNameAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorNameAllocator")
            .field("prefix", &self.prefix)
            .field("max_len", &self.max_len)
            .finish_non_exhaustive()
    }
}
