//! Identifier Generation
//!
//! Local identifiers for conversations and messages are minted through the
//! [`IdGenerator`] trait so tests can substitute a deterministic source.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of locally-minted identifiers
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh identifier
    fn generate(&self) -> String;
}

/// Production generator backed by random UUIDv4
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic generator producing `prefix-1`, `prefix-2`, ...
///
/// Intended for tests that need to predict identifiers.
#[derive(Debug)]
pub struct SequenceIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequenceIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn generate(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_generator_is_unique() {
        let generator = UuidIdGenerator;
        assert_ne!(generator.generate(), generator.generate());
    }

    #[test]
    fn test_sequence_generator_is_deterministic() {
        let generator = SequenceIdGenerator::new("local");
        assert_eq!(generator.generate(), "local-1");
        assert_eq!(generator.generate(), "local-2");
        assert_eq!(generator.generate(), "local-3");
    }
}
