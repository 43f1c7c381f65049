//! Wire and domain types shared across the client.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

// ==================== Device Id ====================

/// Opaque anonymous identifier of this client installation.
///
/// Used by the backend as the correlation key for free-tier quota. The client
/// never interprets its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier carries no value.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ==================== Aspect Ratio ====================

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// Square, the marketplace main-image format.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// Portrait.
    #[serde(rename = "4:5")]
    Portrait,
    /// Landscape.
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "4:5",
            AspectRatio::Landscape => "16:9",
        }
    }

    /// Parses the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "1:1" => Some(AspectRatio::Square),
            "4:5" => Some(AspectRatio::Portrait),
            "16:9" => Some(AspectRatio::Landscape),
            _ => None,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Resolution ====================

/// Output resolution. Only 8k is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "8k")]
    Ultra8k,
}

// ==================== Tier ====================

/// Backend path a generation is billed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Anonymous, quota-limited per device, watermarked output.
    Free,
    /// Authenticated, consumes account credits, clean output.
    Paid,
}

impl Tier {
    /// Selects the tier from the caller's authentication state.
    pub fn for_auth(authenticated: bool) -> Self {
        if authenticated { Tier::Paid } else { Tier::Free }
    }

    /// Returns the generation endpoint for this tier.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Tier::Free => "/api/generate-free",
            Tier::Paid => "/api/generate-paid",
        }
    }
}

// ==================== Generation Request ====================

/// A validated generation request.
///
/// Can only be obtained through [`GenerationRequest::new`], so holding one
/// proves the image was uploaded and the prompt is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    prompt: String,
    image_url: String,
    aspect_ratio: AspectRatio,
    resolution: Resolution,
    device_id: DeviceId,
}

impl GenerationRequest {
    /// Builds a request, rejecting a missing image or a blank prompt.
    pub fn new(
        prompt: &str,
        image_url: Option<&str>,
        aspect_ratio: AspectRatio,
        device_id: DeviceId,
    ) -> Result<Self> {
        let prompt = prompt.trim();
        let image_url = image_url.map(str::trim).unwrap_or_default();
        if image_url.is_empty() || prompt.is_empty() {
            return Err(Error::Validation(
                "Please upload an image and enter a prompt".to_string(),
            ));
        }

        Ok(Self {
            prompt: prompt.to_string(),
            image_url: image_url.to_string(),
            aspect_ratio,
            resolution: Resolution::default(),
            device_id,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }
}

// ==================== Job Status ====================

/// Server-side job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Returns true once no further transitions are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Snapshot of a server-side generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Job identifier.
    pub id: String,

    /// Current status.
    pub status: JobStatus,

    /// Output image reference, once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_image_url: Option<String>,

    /// Failure reason, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ==================== Submit Outcome ====================

/// Successful answer to a generation submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend finished synchronously.
    Completed { output_url: String },
    /// The backend accepted the job and will finish it asynchronously.
    Processing { job_id: String },
}

/// Raw body of a generation endpoint response.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub generation_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output_image_url: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl GenerateResponse {
    /// Discriminates the response into a single outcome.
    pub(crate) fn into_outcome(self) -> Result<SubmitOutcome> {
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

        match self.status.as_deref() {
            Some("completed") => match non_empty(self.output_image_url) {
                Some(output_url) => Ok(SubmitOutcome::Completed { output_url }),
                None => Err(Error::UnexpectedResponse(
                    "completed generation without output_image_url".to_string(),
                )),
            },
            Some("processing") => match non_empty(self.generation_id) {
                Some(job_id) => Ok(SubmitOutcome::Processing { job_id }),
                None => Err(Error::UnexpectedResponse(
                    "processing generation without generation_id".to_string(),
                )),
            },
            Some("failed") => Err(Error::JobFailed(
                non_empty(self.error_message).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            )),
            other => Err(Error::UnexpectedResponse(format!(
                "unknown generation status: {:?}",
                other
            ))),
        }
    }
}

/// Fallback message for a failed job without a server-provided reason.
pub const GENERIC_FAILURE: &str = "Generation failed";

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceId {
        DeviceId::new("dev-1")
    }

    #[test]
    fn request_requires_image_and_prompt() {
        assert!(matches!(
            GenerationRequest::new("   ", Some("/storage/a.jpg"), AspectRatio::Square, device()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            GenerationRequest::new("white background", None, AspectRatio::Square, device()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            GenerationRequest::new("white background", Some(""), AspectRatio::Square, device()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn request_trims_prompt_and_serializes_wire_shape() {
        let req = GenerationRequest::new(
            "  clean white background \n",
            Some("/storage/abc.jpg"),
            AspectRatio::Portrait,
            device(),
        )
        .unwrap();
        assert_eq!(req.prompt(), "clean white background");

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prompt": "clean white background",
                "image_url": "/storage/abc.jpg",
                "aspect_ratio": "4:5",
                "resolution": "8k",
                "device_id": "dev-1",
            })
        );
    }

    #[test]
    fn aspect_ratio_parse() {
        assert_eq!(AspectRatio::parse("16:9"), Some(AspectRatio::Landscape));
        assert_eq!(AspectRatio::parse("3:2"), None);
        assert_eq!(AspectRatio::default().to_string(), "1:1");
    }

    #[test]
    fn tier_routing() {
        assert_eq!(Tier::for_auth(true).endpoint(), "/api/generate-paid");
        assert_eq!(Tier::for_auth(false).endpoint(), "/api/generate-free");
    }

    #[test]
    fn job_deserializes_with_optional_fields() {
        let job: GenerationJob =
            serde_json::from_str(r#"{"id":"g1","status":"processing"}"#).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(!job.status.is_terminal());
        assert!(job.output_image_url.is_none());
    }

    #[test]
    fn response_discrimination() {
        let ack: GenerateResponse =
            serde_json::from_str(r#"{"status":"processing","generation_id":"g1"}"#).unwrap();
        assert_eq!(
            ack.into_outcome().unwrap(),
            SubmitOutcome::Processing { job_id: "g1".into() }
        );

        let done: GenerateResponse = serde_json::from_str(
            r#"{"status":"completed","generation_id":"g2","output_image_url":"/storage/out.jpg"}"#,
        )
        .unwrap();
        assert_eq!(
            done.into_outcome().unwrap(),
            SubmitOutcome::Completed { output_url: "/storage/out.jpg".into() }
        );

        let failed: GenerateResponse =
            serde_json::from_str(r#"{"status":"failed","generation_id":"g3"}"#).unwrap();
        match failed.into_outcome() {
            Err(Error::JobFailed(msg)) => assert_eq!(msg, GENERIC_FAILURE),
            other => panic!("unexpected: {:?}", other),
        }

        let broken: GenerateResponse =
            serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        assert!(matches!(broken.into_outcome(), Err(Error::UnexpectedResponse(_))));
    }
}
