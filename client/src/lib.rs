//! Prodshot client SDK.
//!
//! Drives the product-photo generation flow against the prodshot backend:
//! upload a source image, submit a generation on the free or paid tier,
//! poll the job to completion and turn the stored result into a displayable
//! URL. [`Session`] owns the flow; front ends render its [`ViewState`].

mod account;
mod auth;
mod backend;
mod client;
mod credits;
mod device;
mod error;
pub mod http;
mod poller;
mod resolver;
mod session;
mod submit;
mod types;
mod upload;
mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use account::{GenerationHistory, GenerationHistoryItem, UserInfo, UserService, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use auth::{AuthService, AuthToken, SignupOutcome, MIN_PASSWORD_LEN, OTP_LEN};
pub use backend::{Backend, HttpBackend};
pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use credits::{CreditPack, CreditsService, PurchaseResult};
pub use device::{DeviceIdentity, DeviceStore, FileDeviceStore, MemoryDeviceStore};
pub use error::{error_code, Error, Result};
pub use poller::{CompletionPoller, PollConfig, PollHandle, DEFAULT_MAX_POLL_DURATION, DEFAULT_POLL_INTERVAL};
pub use resolver::{ImageMode, ImageUrlResolver, PROXY_ROUTE, STORAGE_PREFIX};
pub use session::{Session, SessionConfig, SIGNUP_REDIRECT_DELAY};
pub use submit::GenerationSubmitter;
pub use types::{
    AspectRatio, DeviceId, GenerationJob, GenerationRequest, JobStatus, Resolution, SubmitOutcome, Tier,
    GENERIC_FAILURE,
};
pub use upload::{
    content_type_for, SourceFile, UploadCompletion, UploadCoordinator, UploadLimits, UploadStatus, UploadedImageRef,
    ALLOWED_CONTENT_TYPES, DEFAULT_MAX_UPLOAD_BYTES,
};
pub use view::{Navigation, Phase, ViewEvent, ViewState};
