use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::errors::Error;
use crate::token::TokenProvider;
use crate::transport::{ApiRequest, Headers, Transport};

pub const AUTH_HEADER: &str = "X-API-Token";

/// Attaches the verification token to every request before handing it to
/// the transport. No request leaves without a token.
#[derive(Clone)]
pub struct AuthenticatedDispatcher<T, P> {
    transport: T,
    provider: P,
}

impl<T, P> AuthenticatedDispatcher<T, P>
where
    T: Transport,
    P: TokenProvider,
{
    pub fn new(transport: T, provider: P) -> Self {
        Self {
            transport,
            provider,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn get<R: DeserializeOwned>(&self, endpoint: &str, service: &str) -> Result<R, Error> {
        let value = self.send(ApiRequest::get(endpoint, service)).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post<R, B>(&self, endpoint: &str, service: &str, body: &B) -> Result<R, Error>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = self.send(ApiRequest::post(endpoint, service, body)?).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn put<R, B>(&self, endpoint: &str, service: &str, body: &B) -> Result<R, Error>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = self.send(ApiRequest::put(endpoint, service, body)?).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Sends a prepared request with the auth header set, replacing any value
    /// the caller supplied. Transport failures are returned unchanged.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, Error> {
        let headers = self.auth_headers().await?;
        self.transport.send(request.merge_headers(headers)).await
    }

    async fn auth_headers(&self) -> Result<Headers, Error> {
        let token = match self.provider.provide_token().await {
            Ok(token) if !token.is_empty() => token,
            Ok(_) => {
                error!("API verification token is missing");
                return Err(Error::AuthMissing(None));
            }
            Err(err) => {
                error!(error = %err, "failed to get API verification token");
                return Err(Error::AuthMissing(Some(Box::new(err))));
            }
        };
        let mut headers = Headers::new();
        headers.insert(AUTH_HEADER.to_string(), token);
        debug!("API verification token added");
        Ok(headers)
    }
}
