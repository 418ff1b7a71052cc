//! Outbound JSON requests against the backend.

mod http;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::errors::Error;

pub use http::HttpTransport;

pub type Headers = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
        }
    }
}

/// A single backend call: endpoint path, optional service substitution for
/// the base URL, extra headers and a JSON body for POST/PUT.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: String,
    pub service: String,
    pub headers: Headers,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            service: service.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn get(endpoint: impl Into<String>, service: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint, service)
    }

    pub fn post<B: Serialize + ?Sized>(
        endpoint: impl Into<String>,
        service: impl Into<String>,
        body: &B,
    ) -> Result<Self, Error> {
        Ok(Self::new(Method::Post, endpoint, service).with_body(serde_json::to_value(body)?))
    }

    pub fn put<B: Serialize + ?Sized>(
        endpoint: impl Into<String>,
        service: impl Into<String>,
        body: &B,
    ) -> Result<Self, Error> {
        Ok(Self::new(Method::Put, endpoint, service).with_body(serde_json::to_value(body)?))
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds headers; the merged values replace existing ones on collision.
    pub fn merge_headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Sends requests and decodes the JSON response.
///
/// Non-success statuses surface as [`Error::Network`], request timeouts as
/// [`Error::Timeout`] and connection failures as `Error::Network` with
/// status 0.
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<Value, Error>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<Value, Error>> + Send {
        (**self).send(request)
    }
}
