use std::error::Error as StdError;

use thiserror::Error;

use crate::keys::CacheKey;

/// Failure reported by a host-supplied producer.
///
/// Producers are opaque closures, so their failures travel as a flattened
/// message chain rather than a typed error. The type is `Clone` because a
/// single in-flight failure is delivered to every caller waiting on that
/// production.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProducerError {
    message: String,
}

impl ProducerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Flatten an error and its full source chain into one message.
    pub fn from_error(error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            message: messages.join(": "),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("producer failed for cache key `{key}`")]
    Producer {
        key: String,
        #[source]
        source: ProducerError,
    },
}

impl CacheError {
    pub(crate) fn producer(key: &CacheKey, source: ProducerError) -> Self {
        Self::Producer {
            key: key.to_string(),
            source,
        }
    }
}
