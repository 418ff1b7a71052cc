use std::future::Future;
use std::sync::Arc;

use crate::errors::Error;

/// Capability to produce the token attached to outbound requests.
pub trait TokenProvider: Send + Sync {
    fn provide_token(&self) -> impl Future<Output = Result<String, Error>> + Send;
}

impl<P: TokenProvider> TokenProvider for Arc<P> {
    fn provide_token(&self) -> impl Future<Output = Result<String, Error>> + Send {
        (**self).provide_token()
    }
}

/// Hands out a fixed token value.
#[derive(Clone, Debug)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    async fn provide_token(&self) -> Result<String, Error> {
        Ok(self.token.clone())
    }
}
