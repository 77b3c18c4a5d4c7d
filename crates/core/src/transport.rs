//! HTTP transport used by the player backends.

use crate::errors::TransportError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

/// One request against a player's control endpoint
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Appended to the transport's base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of the first query parameter named `key`
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Sends requests and returns the fully buffered response body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Vec<u8>, TransportError>;
}

/// How a transport authenticates
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    /// HTTP basic auth with an empty user name, as VLC expects
    Basic { password: String },
    Bearer(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::None => write!(f, "None"),
            Credentials::Basic { .. } => write!(f, "Basic(***)"),
            Credentials::Bearer(_) => write!(f, "Bearer(***)"),
        }
    }
}

impl Credentials {
    fn validate(&self) -> Result<(), TransportError> {
        let secret = match self {
            Credentials::None => return Ok(()),
            Credentials::Basic { password } => password,
            Credentials::Bearer(token) => token,
        };

        if secret.chars().any(|c| c.is_control()) {
            return Err(TransportError::Auth("credentials contain control characters".to_string()));
        }
        Ok(())
    }
}

/// Map a response status code to a transport result
pub fn check_status(status: u16) -> Result<(), TransportError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(TransportError::Auth(format!("player rejected credentials (HTTP {})", status))),
        _ => Err(TransportError::HttpStatus { status }),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}

/// reqwest-backed transport
///
/// URL format: {base_url}{request.path}?{request.query}
pub struct HttpTransport {
    base_url: String,
    credentials: Credentials,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, credentials, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        credentials.validate()?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, request: &Request) -> String {
        format!("{}{}", self.base_url, request.path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<Vec<u8>, TransportError> {
        let url = self.url_for(request);
        tracing::debug!("{} {} {:?}", request.method.as_str(), url, request.query);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };

        let mut builder = self.client.request(method, &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &self.credentials {
            Credentials::None => builder,
            Credentials::Basic { password } => builder.basic_auth("", Some(password)),
            Credentials::Bearer(token) => builder.bearer_auth(token),
        };
        builder = match &request.body {
            Some(body) => builder.json(body),
            // Spotify rejects body-less PUT/POST without a length
            None if request.method != Method::Get => builder.header(reqwest::header::CONTENT_LENGTH, "0"),
            None => builder,
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        if let Err(e) = check_status(status) {
            tracing::warn!("{} {} returned status {}", request.method.as_str(), url, status);
            return Err(e);
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        tracing::trace!("Response from {}: {} bytes", url, body.len());
        Ok(body.to_vec())
    }
}
