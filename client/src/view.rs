//! The view state a front end renders.
//!
//! A [`ViewState`] is only ever mutated by the session through
//! [`ViewState::apply`]. Events that make no sense in the current phase are
//! ignored, which keeps late or duplicated events from corrupting the view.

use std::fmt;

use serde::Serialize;
use tracing::debug;

/// Phase of the generation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    Uploaded,
    Submitting,
    Polling,
    Completed,
    Failed,
}

impl Phase {
    /// Returns true while a generation request is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Submitting | Phase::Polling)
    }

    /// Returns true if a generation can be started from this phase.
    pub fn can_submit(&self) -> bool {
        matches!(self, Phase::Uploaded | Phase::Completed | Phase::Failed)
    }

    /// Returns true once the current request has a final outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading",
            Phase::Uploaded => "uploaded",
            Phase::Submitting => "submitting",
            Phase::Polling => "polling",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the front end should take the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    /// Account creation, offered when the free quota is used up.
    SignUp,
}

/// Input to the view state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    FileSelected { preview_url: String },
    UploadRetried,
    UploadSucceeded,
    UploadFailed(String),
    SubmitRejected(String),
    SubmitStarted,
    ImmediateResult(String),
    AsyncAck(String),
    SubmitFailed(String),
    JobCompleted(String),
    JobFailed(String),
    RedirectToSignUp,
    /// The front end acted on `navigate_to`.
    NavigationHandled,
}

/// Everything the presentation layer reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ViewState {
    pub phase: Phase,

    /// Local preview of the selected source image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,

    /// Resolved URL of the generated image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Set while the last upload attempt failed; a retry is possible.
    pub upload_failed: bool,

    /// Job being polled, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    /// One-line success message for toasts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<Navigation>,
}

impl ViewState {
    /// Applies an event. Returns false if the event was ignored.
    pub fn apply(&mut self, event: ViewEvent) -> bool {
        use Phase::*;

        let applied = match (&event, self.phase) {
            (ViewEvent::FileSelected { preview_url }, _) => {
                *self = ViewState {
                    phase: Uploading,
                    preview_url: Some(preview_url.clone()),
                    ..Default::default()
                };
                true
            }
            (ViewEvent::UploadRetried, Uploading) if self.upload_failed => {
                self.upload_failed = false;
                self.error_message = None;
                true
            }
            (ViewEvent::UploadSucceeded, Uploading) => {
                self.phase = Uploaded;
                self.upload_failed = false;
                self.error_message = None;
                self.notice = Some("Image uploaded successfully!".to_string());
                true
            }
            (ViewEvent::UploadFailed(msg), Uploading) => {
                self.upload_failed = true;
                self.error_message = Some(msg.clone());
                self.notice = None;
                true
            }
            (ViewEvent::SubmitRejected(msg), phase) if !phase.is_busy() => {
                self.error_message = Some(msg.clone());
                true
            }
            (ViewEvent::SubmitStarted, phase) if phase.can_submit() => {
                self.phase = Submitting;
                self.result_url = None;
                self.error_message = None;
                self.job_id = None;
                self.notice = None;
                true
            }
            (ViewEvent::ImmediateResult(url), Submitting) | (ViewEvent::JobCompleted(url), Polling) => {
                self.phase = Completed;
                self.result_url = Some(url.clone());
                self.notice = Some("Generation completed!".to_string());
                true
            }
            (ViewEvent::AsyncAck(job_id), Submitting) => {
                self.phase = Polling;
                self.job_id = Some(job_id.clone());
                true
            }
            (ViewEvent::SubmitFailed(msg), Submitting) => {
                self.phase = Uploaded;
                self.error_message = Some(msg.clone());
                true
            }
            (ViewEvent::JobFailed(msg), Polling) => {
                self.phase = Failed;
                self.error_message = Some(msg.clone());
                true
            }
            (ViewEvent::RedirectToSignUp, _) => {
                self.navigate_to = Some(Navigation::SignUp);
                true
            }
            (ViewEvent::NavigationHandled, _) if self.navigate_to.is_some() => {
                self.navigate_to = None;
                true
            }
            _ => false,
        };

        if !applied {
            debug!("ignoring {:?} in phase {}", event, self.phase);
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploaded() -> ViewState {
        let mut v = ViewState::default();
        assert!(v.apply(ViewEvent::FileSelected { preview_url: "file:///a.jpg".into() }));
        assert!(v.apply(ViewEvent::UploadSucceeded));
        v
    }

    #[test]
    fn test_happy_path_async() {
        let mut v = uploaded();
        assert_eq!(v.phase, Phase::Uploaded);

        assert!(v.apply(ViewEvent::SubmitStarted));
        assert_eq!(v.phase, Phase::Submitting);
        assert!(v.apply(ViewEvent::AsyncAck("g1".into())));
        assert_eq!(v.phase, Phase::Polling);
        assert_eq!(v.job_id.as_deref(), Some("g1"));

        assert!(v.apply(ViewEvent::JobCompleted("/images/generated/out.jpg".into())));
        assert_eq!(v.phase, Phase::Completed);
        assert_eq!(v.result_url.as_deref(), Some("/images/generated/out.jpg"));
        assert_eq!(v.preview_url.as_deref(), Some("file:///a.jpg"));
    }

    #[test]
    fn test_immediate_result() {
        let mut v = uploaded();
        v.apply(ViewEvent::SubmitStarted);
        assert!(v.apply(ViewEvent::ImmediateResult("https://cdn/x.jpg".into())));
        assert_eq!(v.phase, Phase::Completed);
    }

    #[test]
    fn test_upload_error_stays_uploading() {
        let mut v = ViewState::default();
        v.apply(ViewEvent::FileSelected { preview_url: "p".into() });
        assert!(v.apply(ViewEvent::UploadFailed("Upload failed".into())));
        assert_eq!(v.phase, Phase::Uploading);
        assert!(v.upload_failed);
        assert_eq!(v.preview_url.as_deref(), Some("p"));

        assert!(v.apply(ViewEvent::UploadRetried));
        assert!(!v.upload_failed);
        assert!(!v.apply(ViewEvent::UploadRetried));
    }

    #[test]
    fn test_submit_error_returns_to_uploaded() {
        let mut v = uploaded();
        v.apply(ViewEvent::SubmitStarted);
        assert!(v.apply(ViewEvent::SubmitFailed("Insufficient credits".into())));
        assert_eq!(v.phase, Phase::Uploaded);
        assert_eq!(v.error_message.as_deref(), Some("Insufficient credits"));
        assert!(v.phase.can_submit());
    }

    #[test]
    fn test_job_failure_is_retryable() {
        let mut v = uploaded();
        v.apply(ViewEvent::SubmitStarted);
        v.apply(ViewEvent::AsyncAck("g1".into()));
        assert!(v.apply(ViewEvent::JobFailed("boom".into())));
        assert_eq!(v.phase, Phase::Failed);
        assert!(v.apply(ViewEvent::SubmitStarted));
        assert_eq!(v.error_message, None);
    }

    #[test]
    fn test_rejection_keeps_phase() {
        let mut v = uploaded();
        assert!(v.apply(ViewEvent::SubmitRejected("enter a prompt".into())));
        assert_eq!(v.phase, Phase::Uploaded);
        assert_eq!(v.error_message.as_deref(), Some("enter a prompt"));
    }

    #[test]
    fn test_out_of_phase_events_ignored() {
        let mut v = ViewState::default();
        assert!(!v.apply(ViewEvent::UploadSucceeded));
        assert!(!v.apply(ViewEvent::SubmitStarted));
        assert!(!v.apply(ViewEvent::JobCompleted("x".into())));
        assert_eq!(v, ViewState::default());

        let mut v = uploaded();
        v.apply(ViewEvent::SubmitStarted);
        v.apply(ViewEvent::AsyncAck("g1".into()));
        v.apply(ViewEvent::JobCompleted("x".into()));
        assert!(!v.apply(ViewEvent::JobFailed("late".into())));
        assert_eq!(v.phase, Phase::Completed);
    }

    #[test]
    fn test_new_file_resets_result() {
        let mut v = uploaded();
        v.apply(ViewEvent::SubmitStarted);
        v.apply(ViewEvent::ImmediateResult("x".into()));
        v.apply(ViewEvent::FileSelected { preview_url: "q".into() });
        assert_eq!(v.phase, Phase::Uploading);
        assert_eq!(v.result_url, None);
        assert_eq!(v.preview_url.as_deref(), Some("q"));
    }

    #[test]
    fn test_navigation_cleared() {
        let mut v = uploaded();
        assert!(v.apply(ViewEvent::RedirectToSignUp));
        assert_eq!(v.navigate_to, Some(Navigation::SignUp));
        assert!(v.apply(ViewEvent::NavigationHandled));
        assert_eq!(v.navigate_to, None);
        assert!(!v.apply(ViewEvent::NavigationHandled));

        v.apply(ViewEvent::RedirectToSignUp);
        v.apply(ViewEvent::FileSelected { preview_url: "q".into() });
        assert_eq!(v.navigate_to, None);
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Phase::Polling).unwrap(), "\"polling\"");
        assert_eq!(Phase::Submitting.to_string(), "submitting");
    }
}
