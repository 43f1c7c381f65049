//! HTTP client implementation for the prodshot backend.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT},
    multipart, Client as ReqwestClient, RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::{
    error::{Error, Result},
    types::DeviceId,
};

/// Header carrying the anonymous device identity.
pub const DEVICE_ID_HEADER: &str = "X-Device-ID";

const CLIENT_USER_AGENT: &str = "prodshot-rust/0.1";

/// HTTP client for the prodshot backend.
pub struct HttpClient {
    client: ReqwestClient,
    base_url: String,
    auth_token: Option<String>,
    device_id: Option<DeviceId>,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// `timeout` bounds every individual request; job completion is detected
    /// separately by polling.
    pub fn new(
        base_url: String,
        auth_token: Option<String>,
        device_id: Option<DeviceId>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = ReqwestClient::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
            device_id: device_id.filter(|d| !d.is_empty()),
        })
    }

    /// Returns the backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns true if a bearer credential is configured.
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Performs a GET request with optional query parameters.
    pub async fn get<R>(&self, path: &str, query: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(request).await
    }

    /// Performs a POST request with a JSON body.
    pub async fn post<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("POST {}", url);

        self.send(self.client.post(&url).json(body)).await
    }

    /// Uploads a file using multipart form data.
    pub async fn upload_file<R>(
        &self,
        path: &str,
        file_bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("POST {} (multipart, {} bytes)", url, file_bytes.len());

        let part = multipart::Part::bytes(file_bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let form = multipart::Form::new().part("file", part);

        self.send(self.client.post(&url).multipart(form)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<R>(&self, request: RequestBuilder) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = request.headers(self.default_headers()?).send().await?;
        self.handle_response(response).await
    }

    /// Returns the headers attached to every API call.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::Config(format!("invalid auth token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(device_id) = &self.device_id {
            let value = HeaderValue::from_str(device_id.as_str())
                .map_err(|e| Error::Config(format!("invalid device id: {}", e)))?;
            headers.insert(DEVICE_ID_HEADER, value);
        }

        Ok(headers)
    }

    /// Handles the API response.
    async fn handle_response<R>(&self, response: Response) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(parse_error(&body, status.as_u16()));
        }

        serde_json::from_slice(&body).map_err(Error::from)
    }
}

/// Error body returned by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    code: Option<String>,
}

/// Parses an error response body.
pub(crate) fn parse_error(body: &[u8], http_status: u16) -> Error {
    if let Ok(err) = serde_json::from_slice::<ErrorBody>(body) {
        // Validation failures carry a list of field errors instead of a string.
        let detail = match err.detail {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
            None => None,
        };
        if let Some(detail) = detail {
            return match err.code {
                Some(code) => Error::api_with_code(http_status, detail, code),
                None => Error::api(http_status, detail),
            };
        }
    }

    Error::api(http_status, String::from_utf8_lossy(body).to_string())
}
