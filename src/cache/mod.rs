//! Key/value storage for the persisted verification token.

mod memory;

use std::sync::Arc;
use std::time::Duration;

use crate::errors::Error;

pub use memory::MemoryCache;

/// Storage contract consumed by the token manager.
///
/// Implementations must tolerate concurrent use from request paths and the
/// background refresh task. An entry whose TTL has elapsed reads as absent
/// even if it was never removed.
pub trait TokenCache: Send + Sync {
    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), Error>;
    fn get(&self, key: &str) -> Result<Option<String>, Error>;
    fn remove(&self, key: &str) -> Result<(), Error>;
    fn exists(&self, key: &str) -> Result<bool, Error>;
}

impl<C: TokenCache + ?Sized> TokenCache for Arc<C> {
    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), Error> {
        (**self).set(key, value, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        (**self).get(key)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        (**self).remove(key)
    }

    fn exists(&self, key: &str) -> Result<bool, Error> {
        (**self).exists(key)
    }
}
