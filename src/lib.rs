//! Credential layer for SDK clients of the backend: obtains, caches and
//! refreshes the short-lived API verification token, and attaches it to every
//! outbound request.

pub mod cache;
pub mod config;
pub mod context;
pub mod dispatcher;
mod errors;
pub mod platform;
pub mod telemetry;
pub mod token;
pub mod transport;

pub use cache::{MemoryCache, TokenCache};
pub use config::SdkConfig;
pub use context::SdkContext;
pub use dispatcher::{AUTH_HEADER, AuthenticatedDispatcher};
pub use errors::{Error, Result};
pub use platform::{Platform, SDK_VERSION};
pub use token::{Token, TokenManager, TokenManagerConfig, TokenProvider};
pub use transport::{ApiRequest, HttpTransport, Method, Transport};
