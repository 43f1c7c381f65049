//! The backend seam used by the orchestrator.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    error::Result,
    http::HttpClient,
    types::{DeviceId, GenerateResponse, GenerationJob, GenerationRequest, SubmitOutcome, Tier},
    upload::SourceFile,
};

/// Operations the orchestrator needs from the generation backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Uploads a source image and returns its backend reference.
    async fn upload(&self, file: &SourceFile) -> Result<String>;

    /// Submits a generation on the given tier.
    async fn generate(&self, tier: Tier, request: &GenerationRequest) -> Result<SubmitOutcome>;

    /// Fetches a snapshot of a generation job.
    async fn generation_status(
        &self,
        job_id: &str,
        device_id: Option<&DeviceId>,
    ) -> Result<GenerationJob>;
}

/// [`Backend`] over the prodshot HTTP API.
#[derive(Clone)]
pub struct HttpBackend {
    http: Arc<HttpClient>,
}

impl HttpBackend {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn upload(&self, file: &SourceFile) -> Result<String> {
        #[derive(Deserialize)]
        struct Response {
            image_url: String,
        }

        let resp: Response = self
            .http
            .upload_file(
                "/api/upload",
                file.bytes().to_vec(),
                file.name(),
                file.content_type(),
            )
            .await?;
        Ok(resp.image_url)
    }

    async fn generate(&self, tier: Tier, request: &GenerationRequest) -> Result<SubmitOutcome> {
        let resp: GenerateResponse = self.http.post(tier.endpoint(), request).await?;
        resp.into_outcome()
    }

    async fn generation_status(
        &self,
        job_id: &str,
        device_id: Option<&DeviceId>,
    ) -> Result<GenerationJob> {
        let path = format!("/api/generations/{}", job_id);
        let query: Vec<(&str, String)> = device_id
            .map(|d| vec![("device_id", d.as_str().to_string())])
            .unwrap_or_default();

        self.http.get(&path, &query).await
    }
}
