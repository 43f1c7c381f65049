//! Generation submission.

use std::sync::Arc;

use tracing::{info, warn};

use super::{
    backend::Backend,
    error::{Error, Result},
    types::{GenerationRequest, SubmitOutcome, Tier},
};

/// Sends generation requests on the free or paid backend path.
pub struct GenerationSubmitter<B: Backend + ?Sized> {
    backend: Arc<B>,
}

impl<B: Backend + ?Sized> Clone for GenerationSubmitter<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl<B: Backend + ?Sized> GenerationSubmitter<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Submits `request`, issuing exactly one backend call.
    ///
    /// Authenticated callers go to the paid endpoint. Anonymous callers go to
    /// the free endpoint, which is quota-limited per device id; the quota is
    /// never pre-checked here, see [`Error::is_quota_exceeded`].
    pub async fn submit(
        &self,
        request: &GenerationRequest,
        authenticated: bool,
    ) -> Result<SubmitOutcome> {
        let tier = Tier::for_auth(authenticated);
        check(request, tier)?;

        info!(
            "submitting generation: tier={:?}, aspect_ratio={}, prompt={:.50}",
            tier,
            request.aspect_ratio(),
            request.prompt()
        );

        match self.backend.generate(tier, request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("generation submit failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Preconditions checked before anything goes on the wire.
fn check(request: &GenerationRequest, tier: Tier) -> Result<()> {
    if request.image_url().trim().is_empty() || request.prompt().trim().is_empty() {
        return Err(Error::Validation(
            "Please upload an image and enter a prompt".to_string(),
        ));
    }
    if tier == Tier::Free && request.device_id().is_empty() {
        return Err(Error::Validation("device_id is required".to_string()));
    }
    Ok(())
}
