//! Prodshot API client.

use std::{sync::Arc, time::Duration};

use url::Url;

use super::{
    account::UserService,
    auth::AuthService,
    backend::HttpBackend,
    credits::CreditsService,
    error::{Error, Result},
    http::HttpClient,
    poller::PollConfig,
    resolver::{ImageMode, ImageUrlResolver},
    session::{Session, SessionConfig, SIGNUP_REDIRECT_DELAY},
    types::DeviceId,
    upload::UploadLimits,
};

/// Default backend URL for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Prodshot API client.
///
/// Cheap to share; every [`Session`] it creates talks to the same backend.
///
/// # Example
///
/// ```ignore
/// use prodshot_client::{Client, DeviceId};
///
/// let client = Client::builder("https://api.example.com")
///     .device_id(DeviceId::generate())
///     .build()?;
/// let session = client.session();
/// ```
pub struct Client {
    http: Arc<HttpClient>,
    config: ClientConfig,
}

#[derive(Clone)]
struct ClientConfig {
    base_url: String,
    device_id: DeviceId,
    resolver: Arc<ImageUrlResolver>,
    poll: PollConfig,
    upload_limits: UploadLimits,
    signup_redirect_delay: Duration,
}

impl Client {
    /// Creates an anonymous client with default settings.
    pub fn new(base_url: impl Into<String>, device_id: DeviceId) -> Result<Self> {
        ClientBuilder::new(base_url).device_id(device_id).build()
    }

    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.config.device_id
    }

    /// Returns true if requests carry a bearer credential.
    pub fn is_authenticated(&self) -> bool {
        self.http.is_authenticated()
    }

    pub fn resolver(&self) -> &Arc<ImageUrlResolver> {
        &self.config.resolver
    }

    /// Starts a new generation session.
    pub fn session(&self) -> Session<HttpBackend> {
        let mut config = SessionConfig::new(self.config.device_id.clone());
        config.authenticated = self.is_authenticated();
        config.poll = self.config.poll.clone();
        config.upload_limits = self.config.upload_limits.clone();
        config.signup_redirect_delay = self.config.signup_redirect_delay;

        Session::new(
            Arc::new(HttpBackend::new(self.http.clone())),
            self.config.resolver.clone(),
            config,
        )
    }

    /// Returns the account service.
    pub fn user(&self) -> UserService {
        UserService::new(self.http.clone(), self.config.resolver.clone())
    }

    /// Returns the authentication service.
    pub fn auth(&self) -> AuthService {
        AuthService::new(self.http.clone())
    }

    /// Returns the credits service.
    pub fn credits(&self) -> CreditsService {
        CreditsService::new(self.http.clone())
    }

    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    base_url: String,
    auth_token: Option<String>,
    device_id: Option<DeviceId>,
    timeout: Duration,
    image_mode: ImageMode,
    poll: PollConfig,
    upload_limits: UploadLimits,
    signup_redirect_delay: Duration,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            device_id: None,
            timeout: DEFAULT_TIMEOUT,
            image_mode: ImageMode::default(),
            poll: PollConfig::default(),
            upload_limits: UploadLimits::default(),
            signup_redirect_delay: SIGNUP_REDIRECT_DELAY,
        }
    }

    /// Sets the bearer credential. Authenticated clients use the paid tier.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = (!token.is_empty()).then_some(token);
        self
    }

    /// Sets the device id used for the free tier.
    pub fn device_id(mut self, device_id: DeviceId) -> Self {
        self.device_id = Some(device_id);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how generated image references are turned into URLs.
    pub fn image_mode(mut self, mode: ImageMode) -> Self {
        self.image_mode = mode;
        self
    }

    pub fn poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn upload_limits(mut self, limits: UploadLimits) -> Self {
        self.upload_limits = limits;
        self
    }

    pub fn signup_redirect_delay(mut self, delay: Duration) -> Self {
        self.signup_redirect_delay = delay;
        self
    }

    /// Builds the client.
    ///
    /// Without a device id a random one is used for this client only; use
    /// [`DeviceIdentity`](crate::DeviceIdentity) to keep it stable across runs.
    pub fn build(self) -> Result<Client> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid base_url {:?}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be positive".to_string()));
        }
        if self.poll.interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }

        let base_url = self.base_url.trim_end_matches('/').to_string();
        let device_id = self.device_id.unwrap_or_else(|| {
            tracing::debug!("no device id configured, using an ephemeral one");
            DeviceId::generate()
        });

        let http = HttpClient::new(
            base_url.clone(),
            self.auth_token,
            Some(device_id.clone()),
            self.timeout,
        )?;
        let resolver = ImageUrlResolver::new(base_url.clone(), self.image_mode);

        Ok(Client {
            http: Arc::new(http),
            config: ClientConfig {
                base_url,
                device_id,
                resolver: Arc::new(resolver),
                poll: self.poll,
                upload_limits: self.upload_limits,
                signup_redirect_delay: self.signup_redirect_delay,
            },
        })
    }
}
