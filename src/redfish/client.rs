//! Redfish Client
//!
//! Main client for a Redfish service, combining session handling and the
//! HTTP layer, and the entry point into the resource graph.

use super::http::{HttpOptions, RedfishHttpClient};
use super::session::{Auth, Session};
use crate::error::{Error, Result};
use crate::resource::{Attribute, Resource, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Service root of every Redfish implementation
pub const SERVICE_ROOT: &str = "/redfish/v1";

/// Session collection used for login
pub const SESSIONS_PATH: &str = "/redfish/v1/SessionService/Sessions";

/// Options for [`RedfishClient::new`]
#[derive(Clone)]
pub struct ClientOptions {
    /// e.g. `https://bmc.example.com`
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Session (`X-Auth-Token`) auth when true, HTTP Basic otherwise
    pub use_session: bool,
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn new(base_url: &str) -> Self {
        let http = HttpOptions::default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: None,
            password: None,
            use_session: true,
            verify_tls: http.verify_tls,
            timeout: http.timeout,
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn with_basic_auth(mut self) -> Self {
        self.use_session = false;
        self
    }

    pub fn insecure(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("use_session", &self.use_session)
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// What resources hold as their transport. Kept apart from the client so
/// the cached root does not keep itself alive.
struct Connection {
    http: RedfishHttpClient,
    session: Session,
    options: ClientOptions,
}

impl Connection {
    async fn auth(&self) -> Auth {
        if let Some(token) = self.session.token().await {
            return Auth::Token(token);
        }
        match self.options.credentials() {
            Some((username, password)) if !self.options.use_session => Auth::Basic {
                username: username.to_string(),
                password: password.to_string(),
            },
            _ => Auth::Anonymous,
        }
    }
}

#[async_trait]
impl Transport for Connection {
    async fn get(&self, address: &str) -> Result<Value> {
        let auth = self.auth().await;
        self.http.get(address, &auth).await
    }

    async fn post(&self, address: &str, body: Option<&Value>) -> Result<Option<Value>> {
        let auth = self.auth().await;
        self.http.post(address, &auth, body).await
    }

    async fn patch(&self, address: &str, fields: &Value, version: Option<&str>) -> Result<()> {
        let auth = self.auth().await;
        self.http.patch(address, &auth, fields, version).await
    }

    async fn delete(&self, address: &str) -> Result<()> {
        let auth = self.auth().await;
        self.http.delete(address, &auth).await
    }
}

/// Main Redfish client
#[derive(Clone)]
pub struct RedfishClient {
    connection: Arc<Connection>,
    root: Arc<Mutex<Option<Resource>>>,
}

impl RedfishClient {
    /// Create a new client. Nothing is sent until the first request.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = RedfishHttpClient::new(
            &options.base_url,
            &HttpOptions {
                verify_tls: options.verify_tls,
                timeout: options.timeout,
            },
        )?;

        if !options.verify_tls {
            tracing::warn!("TLS certificate verification disabled for {}", options.base_url);
        }

        Ok(Self {
            connection: Arc::new(Connection {
                http,
                session: Session::new(),
                options,
            }),
            root: Arc::new(Mutex::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        self.connection.http.base_url()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.connection.options
    }

    /// The transport resources of this client share
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.connection) as Arc<dyn Transport>
    }

    pub async fn is_logged_in(&self) -> bool {
        self.connection.session.is_active().await
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Open a session and use its token for every later request
    pub async fn login(&self) -> Result<()> {
        let Some((username, password)) = self.connection.options.credentials() else {
            return Err(Error::Login(
                "Username/password required for session login".to_string(),
            ));
        };

        let grant = self
            .connection
            .http
            .create_session(SESSIONS_PATH, username, password)
            .await?;

        match grant.token {
            Some(token) => {
                tracing::info!("Logged in to {} as {}", self.base_url(), username);
                self.connection.session.store(token, grant.location).await;
            },
            None => tracing::warn!("Login to {} returned no X-Auth-Token", self.base_url()),
        }
        Ok(())
    }

    /// Delete the session resource and forget all session state.
    ///
    /// Local state is cleared even when the DELETE fails; the error is still
    /// returned.
    pub async fn logout(&self) -> Result<()> {
        let state = self.connection.session.take().await;
        *self.root.lock().await = None;

        let Some(state) = state else {
            return Ok(());
        };
        let Some(location) = state.location else {
            return Ok(());
        };

        tracing::info!("Logging out of {}", self.base_url());
        self.connection
            .http
            .delete(&location, &Auth::Token(state.token))
            .await
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Log in if needed, fetch the service root and cache it
    pub async fn connect(&self) -> Result<Resource> {
        let mut cached = self.root.lock().await;
        let root = self.load_root().await?;
        *cached = Some(root.clone());
        Ok(root)
    }

    async fn load_root(&self) -> Result<Resource> {
        let options = &self.connection.options;
        if options.use_session
            && options.credentials().is_some()
            && !self.connection.session.is_active().await
        {
            self.login().await?;
        }
        self.fetch(SERVICE_ROOT).await
    }

    /// The cached service root, connecting first if needed
    pub async fn root(&self) -> Result<Resource> {
        let mut cached = self.root.lock().await;
        let root = match cached.take() {
            Some(root) => root,
            None => self.load_root().await?,
        };
        Ok(cached.insert(root).clone())
    }

    /// Attribute of the service root, e.g. `Systems`, or `System` when
    /// there is exactly one system
    pub async fn attr(&self, name: &str) -> Result<Attribute> {
        let mut cached = self.root.lock().await;
        let root = match cached.take() {
            Some(root) => root,
            None => self.load_root().await?,
        };
        cached.insert(root).attr(name).await
    }

    /// Link stub for any address; fetched on first use
    pub fn resource(&self, address: &str) -> Resource {
        Resource::stub(self.transport(), address)
    }

    /// Fetch and materialize the resource at `address`
    pub async fn fetch(&self, address: &str) -> Result<Resource> {
        let mut resource = self.resource(address);
        resource.ensure_materialized().await?;
        Ok(resource)
    }
}

#[async_trait]
impl Transport for RedfishClient {
    async fn get(&self, address: &str) -> Result<Value> {
        self.connection.get(address).await
    }

    async fn post(&self, address: &str, body: Option<&Value>) -> Result<Option<Value>> {
        self.connection.post(address, body).await
    }

    async fn patch(&self, address: &str, fields: &Value, version: Option<&str>) -> Result<()> {
        self.connection.patch(address, fields, version).await
    }

    async fn delete(&self, address: &str) -> Result<()> {
        self.connection.delete(address).await
    }
}
