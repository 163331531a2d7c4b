//! HTTP utilities for Redfish REST calls

use super::session::Auth;
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, IF_MATCH, LOCATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Session token header issued on login and sent on every later request
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub fn sanitize_for_log(body: &str) -> String {
    let total = body.chars().count();
    let truncated = if total > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Join a relative address to the base URL; absolute URLs pass through
pub fn join_url(base: &str, address: &str) -> String {
    if Url::parse(address).is_ok_and(|u| u.has_host()) {
        return address.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), address.trim_start_matches('/'))
}

/// Connection settings for [`RedfishHttpClient`]
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Token and session address returned by a successful login
#[derive(Debug, Clone, Default)]
pub struct SessionGrant {
    pub token: Option<String>,
    pub location: Option<String>,
}

/// HTTP client wrapper for Redfish API calls
#[derive(Clone)]
pub struct RedfishHttpClient {
    client: Client,
    base_url: String,
}

impl RedfishHttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, options: &HttpOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(concat!("rfnav/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify_tls)
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an address
    pub fn url(&self, address: &str) -> String {
        join_url(&self.base_url, address)
    }

    fn authorize(request: RequestBuilder, auth: &Auth) -> RequestBuilder {
        match auth {
            Auth::Anonymous => request,
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Token(token) => request.header(AUTH_TOKEN_HEADER, token),
        }
    }

    /// Send a request and read status, headers and body; non-2xx is an error
    async fn send(
        &self,
        method: &'static str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<(StatusCode, HeaderMap, String)> {
        let response = request.send().await.map_err(|source| Error::Request {
            method,
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|source| Error::Request {
            method,
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            let sanitized = sanitize_for_log(&body);
            tracing::error!("{} {} -> {} {}", method, url, status, sanitized);
            return Err(Error::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                body: sanitized,
            });
        }

        Ok((status, headers, body))
    }

    /// Make a GET request; an empty body reads as `{}`
    pub async fn get(&self, address: &str, auth: &Auth) -> Result<Value> {
        let url = self.url(address);
        tracing::debug!("GET {}", url);

        let request = Self::authorize(self.client.get(&url), auth);
        let (_, _, body) = self.send("GET", &url, request).await?;

        if body.trim().is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(&body).map_err(|_| Error::Malformed {
            method: "GET",
            url,
            reason: "a non-JSON body".to_string(),
        })
    }

    /// Make a POST request; the body defaults to `{}`
    pub async fn post(
        &self,
        address: &str,
        auth: &Auth,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = self.url(address);
        tracing::debug!("POST {}", url);

        let empty = Value::Object(Map::new());
        let request = Self::authorize(self.client.post(&url), auth).json(body.unwrap_or(&empty));
        let (status, _, response_body) = self.send("POST", &url, request).await?;

        // Only 200/201 carry a resource body; 202/204 and unparsable bodies yield nothing
        if !matches!(status, StatusCode::OK | StatusCode::CREATED) || response_body.is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&response_body).ok())
    }

    /// Make a PATCH request, conditional on `etag` when given
    pub async fn patch(
        &self,
        address: &str,
        auth: &Auth,
        fields: &Value,
        etag: Option<&str>,
    ) -> Result<()> {
        let url = self.url(address);
        tracing::debug!("PATCH {} (If-Match: {:?})", url, etag);

        let mut request = Self::authorize(self.client.patch(&url), auth).json(fields);
        if let Some(etag) = etag {
            request = request.header(IF_MATCH, etag);
        }
        self.send("PATCH", &url, request).await?;
        Ok(())
    }

    /// Make a DELETE request
    pub async fn delete(&self, address: &str, auth: &Auth) -> Result<()> {
        let url = self.url(address);
        tracing::debug!("DELETE {}", url);

        let request = Self::authorize(self.client.delete(&url), auth);
        self.send("DELETE", &url, request).await?;
        Ok(())
    }

    /// POST credentials to the session collection and read the grant headers
    pub async fn create_session(
        &self,
        sessions_path: &str,
        username: &str,
        password: &str,
    ) -> Result<SessionGrant> {
        let url = self.url(sessions_path);
        tracing::debug!("POST {} (login as {})", url, username);

        let request = self
            .client
            .post(&url)
            .json(&json!({"UserName": username, "Password": password}));
        let (status, headers, _) = self.send("POST", &url, request).await.map_err(|e| match e {
            Error::Status { status, .. } => Error::Login(format!("{} returned {}", url, status)),
            other => other,
        })?;

        if !matches!(status, StatusCode::OK | StatusCode::CREATED) {
            return Err(Error::Login(format!("{} returned {}", url, status)));
        }

        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Ok(SessionGrant {
            token: header(HeaderName::from_static(AUTH_TOKEN_HEADER)),
            location: header(LOCATION).map(|loc| self.url(&loc)),
        })
    }
}

/// Format a Redfish error for display
/// Security: Maps status codes to generic messages instead of echoing service text
pub fn format_redfish_error(error: &Error) -> String {
    match error.status() {
        Some(401) => return "Authentication failed. Check the username and password.".to_string(),
        Some(403) => return "Permission denied. The account lacks the required privilege.".to_string(),
        Some(404) => return "Resource not found.".to_string(),
        Some(405) => return "The service does not allow this operation here.".to_string(),
        Some(409) => return "Resource conflict. The resource may already exist or be in use.".to_string(),
        Some(412) => {
            return "Resource changed since it was read (ETag mismatch). Refresh and retry.".to_string()
        },
        Some(400) => return "Invalid request. Check your parameters.".to_string(),
        Some(500..=599) => return "BMC temporarily unavailable. Please try again.".to_string(),
        _ => {},
    }

    if let Error::Request { source, .. } = error {
        if source.is_timeout() {
            return "Request timed out. Check that the BMC is reachable.".to_string();
        }
        if source.is_connect() {
            return "Could not connect to the BMC. Check the URL and your network.".to_string();
        }
    }

    error.to_string()
}
