mod envelope;
mod manager;
mod policy;
mod provider;
pub mod schedule;

pub use envelope::{DecodeError, EXPIRED_SENTINEL, Token, decode_expiry};
pub use manager::{
    TOKEN_CACHE_KEY, TOKEN_ENDPOINT, TOKEN_SERVICE, TokenManager, TokenManagerConfig,
};
pub use policy::{DEFAULT_CACHE_TTL, DEFAULT_REFRESH_LEAD, DEFAULT_SAFETY_BUFFER, RefreshPolicy};
pub use provider::{StaticTokenProvider, TokenProvider};
