//! HTTP client implementation

use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{header, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use swarmhub_models::SubmitAck;

use crate::errors::ClientError;

/// HTTP client for the SwarmHub API
pub struct HttpClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    upload_timeout: Option<Duration>,
    auth_cookie: Option<SecretString>,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// `timeout` bounds connecting and every JSON request as a whole. Uploads
    /// stream their body for as long as it takes unless an upload timeout is
    /// set with [`HttpClient::with_upload_timeout`].
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Url::parse(base_url).map_err(|e| {
            ClientError::ConfigError(format!("invalid base URL {:?}: {}", base_url, e))
        })?;

        let client = Client::builder().connect_timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            upload_timeout: None,
            auth_cookie: None,
        })
    }

    /// Bound multipart uploads as a whole. `None` leaves them unbounded.
    pub fn with_upload_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Forward an opaque `Authorization` cookie with every request
    pub fn with_auth_cookie(mut self, cookie: SecretString) -> Self {
        self.auth_cookie = Some(cookie);
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Auth cookie plus the per-request timeout
    fn bounded(&self, request: RequestBuilder) -> RequestBuilder {
        self.with_auth(request.timeout(self.timeout))
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_cookie {
            Some(cookie) => request.header(
                header::COOKIE,
                format!("Authorization={}", cookie.expose_secret()),
            ),
            None => request,
        }
    }

    async fn check(method: &str, response: Response) -> Result<Response, ClientError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} failed: {} - {}", method, status, body);
            return Err(ClientError::ServerError { status, body });
        }
        Ok(response)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.bounded(self.client.get(&url)).send().await?;
        let response = Self::check("GET", response).await?;

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .bounded(self.client.get(&url).query(query))
            .send()
            .await?;
        let response = Self::check("GET", response).await?;

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a POST request with a JSON body, reading the answer as an ack
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<SubmitAck, ClientError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self.bounded(self.client.post(&url).json(body)).send().await?;
        let response = Self::check("POST", response).await?;

        read_ack(response).await
    }

    /// Make a POST request without a body
    pub async fn post_empty(&self, path: &str) -> Result<SubmitAck, ClientError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self.bounded(self.client.post(&url)).send().await?;
        let response = Self::check("POST", response).await?;

        read_ack(response).await
    }

    /// Make a DELETE request without a body
    pub async fn delete(&self, path: &str) -> Result<SubmitAck, ClientError> {
        let url = self.url(path);
        debug!("DELETE {}", url);

        let response = self.bounded(self.client.delete(&url)).send().await?;
        let response = Self::check("DELETE", response).await?;

        read_ack(response).await
    }

    /// Make a multipart POST request
    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<SubmitAck, ClientError> {
        let url = self.url(path);
        debug!("POST {} (multipart)", url);

        let mut request = self.client.post(&url).multipart(form);
        if let Some(timeout) = self.upload_timeout {
            request = request.timeout(timeout);
        }
        let response = self.with_auth(request).send().await?;
        let response = Self::check("POST", response).await?;

        read_ack(response).await
    }
}

/// Read a response that may be empty, plain text or JSON
async fn read_ack(response: Response) -> Result<SubmitAck, ClientError> {
    let text = response.text().await?;
    Ok(parse_ack(&text))
}

fn parse_ack(text: &str) -> SubmitAck {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return SubmitAck::default();
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| SubmitAck {
        description: trimmed.to_string(),
        ..Default::default()
    })
}

/// Some endpoints answer 200 with a plain-text reason when they refuse a
/// command. Only an ack whose text starts with `accepted` counts as success.
pub fn require_ack(ack: SubmitAck, accepted: &str) -> Result<SubmitAck, ClientError> {
    if ack.description.starts_with(accepted) {
        Ok(ack)
    } else {
        Err(ClientError::Rejected(ack.description))
    }
}

/// Join `segments` into an absolute path, percent-encoding each one
pub fn encoded_path(segments: &[&str]) -> Result<String, ClientError> {
    let mut url =
        Url::parse("http://localhost/").map_err(|e| ClientError::Internal(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Internal("URL cannot carry a path".to_string()))?
        .clear()
        .extend(segments);
    Ok(url.path().to_string())
}
