//! The generation session: one source image, one result at a time.
//!
//! [`Session`] is the only owner of mutable flow state. It wires the upload
//! coordinator, the submitter and the completion poller together and
//! publishes every change of the [`ViewState`] on a watch channel.
//!
//! Results that arrive for a superseded file or a superseded generation
//! attempt are dropped, so a late response can never overwrite newer state.
//!
//! # Example
//!
//! ```ignore
//! let session = client.session();
//! let mut view = session.subscribe();
//!
//! session.select_file(SourceFile::open("shoe.jpg").await?);
//! view.wait_for(|v| v.phase == Phase::Uploaded).await?;
//!
//! session.submit("on a marble table", AspectRatio::Square).await?;
//! let done = view.wait_for(|v| v.phase.is_terminal()).await?;
//! println!("{:?}", done.result_url);
//! ```

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    backend::Backend,
    error::{Error, Result},
    poller::{CompletionPoller, PollConfig, PollHandle},
    resolver::ImageUrlResolver,
    submit::GenerationSubmitter,
    types::{AspectRatio, DeviceId, GenerationRequest, SubmitOutcome},
    upload::{SourceFile, UploadCompletion, UploadCoordinator, UploadLimits, UploadedImageRef},
    view::{ViewEvent, ViewState},
};

/// Delay before sending an anonymous user to sign-up after the free quota ran out.
pub const SIGNUP_REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Whether a bearer credential is configured; selects the paid tier.
    pub authenticated: bool,
    pub device_id: DeviceId,
    pub poll: PollConfig,
    pub upload_limits: UploadLimits,
    pub signup_redirect_delay: Duration,
}

impl SessionConfig {
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            authenticated: false,
            device_id,
            poll: PollConfig::default(),
            upload_limits: UploadLimits::default(),
            signup_redirect_delay: SIGNUP_REDIRECT_DELAY,
        }
    }
}

/// Orchestrates upload, submission and polling for one view.
///
/// Methods that start background work must be called inside a tokio runtime.
/// Dropping the session cancels all of it.
pub struct Session<B: Backend + ?Sized + 'static> {
    shared: Arc<Shared<B>>,
}

struct Shared<B: Backend + ?Sized + 'static> {
    backend: Arc<B>,
    submitter: GenerationSubmitter<B>,
    poller: CompletionPoller<B>,
    resolver: Arc<ImageUrlResolver>,
    authenticated: bool,
    device_id: DeviceId,
    redirect_delay: Duration,
    state: Mutex<State>,
    view_tx: watch::Sender<ViewState>,
    shutdown: CancellationToken,
}

struct State {
    uploads: UploadCoordinator,
    view: ViewState,
    /// Bumped whenever a new generation starts or the selection changes.
    attempt: u64,
    submit_in_flight: bool,
    poll: Option<PollHandle>,
    closed: bool,
}

impl<B: Backend + ?Sized + 'static> Session<B> {
    pub fn new(backend: Arc<B>, resolver: Arc<ImageUrlResolver>, config: SessionConfig) -> Self {
        let (view_tx, _) = watch::channel(ViewState::default());
        let shared = Shared {
            submitter: GenerationSubmitter::new(backend.clone()),
            poller: CompletionPoller::new(backend.clone(), resolver.clone(), config.poll),
            backend,
            resolver,
            authenticated: config.authenticated,
            device_id: config.device_id,
            redirect_delay: config.signup_redirect_delay,
            state: Mutex::new(State {
                uploads: UploadCoordinator::new(config.upload_limits),
                view: ViewState::default(),
                attempt: 0,
                submit_in_flight: false,
                poll: None,
                closed: false,
            }),
            view_tx,
            shutdown: CancellationToken::new(),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Subscribes to view changes. The receiver starts at the current view.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.shared.view_tx.subscribe()
    }

    /// Returns a snapshot of the current view.
    pub fn view(&self) -> ViewState {
        self.shared.state.lock().view.clone()
    }

    /// Returns the current selection and its upload result, if any.
    pub fn uploaded_image(&self) -> Option<UploadedImageRef> {
        self.shared.state.lock().uploads.current().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.authenticated
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.shared.device_id
    }

    /// Replaces the source image and starts uploading it.
    ///
    /// Any running generation is abandoned.
    pub fn select_file(&self, file: SourceFile) {
        self.shared.select_file(file);
    }

    /// Uploads the current file again after a failed attempt.
    pub fn retry_upload(&self) {
        self.shared.retry_upload();
    }

    /// Starts a generation for the uploaded image.
    ///
    /// Returns once the backend acknowledged the request. The final result
    /// shows up in the view. Fails with [`Error::Busy`] while another
    /// generation is running.
    pub async fn submit(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<()> {
        self.shared.submit(prompt, aspect_ratio).await
    }

    /// Acknowledges a pending navigation so it is not acted on twice.
    pub fn clear_navigation(&self) {
        let mut st = self.shared.state.lock();
        if st.view.apply(ViewEvent::NavigationHandled) {
            self.shared.publish(&st);
        }
    }

    /// Stops all background work. Later calls fail with [`Error::Closed`].
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }
}

impl<B: Backend + ?Sized + 'static> Drop for Session<B> {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl<B: Backend + ?Sized + 'static> Shared<B> {
    fn publish(&self, state: &State) {
        self.view_tx.send_replace(state.view.clone());
    }

    fn select_file(self: &Arc<Self>, file: SourceFile) {
        let file = {
            let mut st = self.state.lock();
            if st.closed {
                return;
            }
            st.attempt += 1;
            if let Some(poll) = st.poll.take() {
                poll.cancel();
            }

            let file = st.uploads.select(file);
            let preview_url = st.uploads.preview_url().unwrap_or_default().to_string();
            st.view.apply(ViewEvent::FileSelected { preview_url });

            if !self.precheck(&mut st, &file) {
                return;
            }
            self.publish(&st);
            file
        };
        self.spawn_upload(file);
    }

    /// Runs the local upload checks. A rejected file is marked failed and
    /// the view is published; returns false in that case.
    fn precheck(&self, st: &mut State, file: &Arc<SourceFile>) -> bool {
        let Err(e) = st.uploads.precheck(file) else {
            return true;
        };
        warn!("rejected {}: {}", file.name(), e);
        if let UploadCompletion::Failed(msg) = st.uploads.complete(file, Err(e)) {
            st.view.apply(ViewEvent::UploadFailed(msg));
        }
        self.publish(st);
        false
    }

    fn retry_upload(self: &Arc<Self>) {
        let file = {
            let mut st = self.state.lock();
            if st.closed {
                return;
            }
            let Some(file) = st.uploads.retry() else {
                debug!("nothing to retry");
                return;
            };
            st.view.apply(ViewEvent::UploadRetried);
            if !self.precheck(&mut st, &file) {
                return;
            }
            self.publish(&st);
            file
        };
        self.spawn_upload(file);
    }

    fn spawn_upload(self: &Arc<Self>, file: Arc<SourceFile>) {
        let shared = self.clone();
        tokio::spawn(async move {
            info!("uploading {} ({} bytes)", file.name(), file.len());
            let result = tokio::select! {
                _ = shared.shutdown.cancelled() => return,
                r = shared.backend.upload(&file) => r,
            };
            shared.finish_upload(&file, result);
        });
    }

    fn finish_upload(&self, file: &Arc<SourceFile>, result: Result<String>) {
        let mut st = self.state.lock();
        if st.closed {
            return;
        }
        match st.uploads.complete(file, result) {
            UploadCompletion::Stale => return,
            UploadCompletion::Uploaded(url) => {
                info!("uploaded {} as {}", file.name(), url);
                st.view.apply(ViewEvent::UploadSucceeded);
            }
            UploadCompletion::Failed(msg) => {
                warn!("upload of {} failed: {}", file.name(), msg);
                st.view.apply(ViewEvent::UploadFailed(msg));
            }
        }
        self.publish(&st);
    }

    async fn submit(self: &Arc<Self>, prompt: &str, aspect_ratio: AspectRatio) -> Result<()> {
        let (request, attempt) = {
            let mut st = self.state.lock();
            if st.closed {
                return Err(Error::Closed);
            }
            if st.submit_in_flight || st.view.phase.is_busy() {
                return Err(Error::Busy);
            }

            let request = match GenerationRequest::new(
                prompt,
                st.uploads.remote_image_url(),
                aspect_ratio,
                self.device_id.clone(),
            ) {
                Ok(request) => request,
                Err(e) => {
                    st.view.apply(ViewEvent::SubmitRejected(e.user_message()));
                    self.publish(&st);
                    return Err(e);
                }
            };

            st.attempt += 1;
            if let Some(poll) = st.poll.take() {
                poll.cancel();
            }
            st.submit_in_flight = true;
            st.view.apply(ViewEvent::SubmitStarted);
            self.publish(&st);
            (request, st.attempt)
        };

        let result = tokio::select! {
            _ = self.shutdown.cancelled() => Err(Error::Closed),
            r = self.submitter.submit(&request, self.authenticated) => r,
        };

        let mut st = self.state.lock();
        st.submit_in_flight = false;
        if st.closed {
            return Err(Error::Closed);
        }
        if st.attempt != attempt {
            debug!("dropping result of superseded attempt {}", attempt);
            return result.map(|_| ());
        }

        match result {
            Ok(SubmitOutcome::Completed { output_url }) => {
                let url = self.resolver.resolve_str(&output_url).unwrap_or(output_url);
                info!("generation completed immediately: {}", url);
                st.view.apply(ViewEvent::ImmediateResult(url));
            }
            Ok(SubmitOutcome::Processing { job_id }) => {
                info!("generation {} accepted, polling", job_id);
                st.view.apply(ViewEvent::AsyncAck(job_id.clone()));
                st.poll = Some(self.start_poll(job_id, attempt));
            }
            Err(e) => {
                st.view.apply(ViewEvent::SubmitFailed(e.user_message()));
                if !self.authenticated && e.is_quota_exceeded() {
                    self.schedule_signup_redirect();
                }
                self.publish(&st);
                return Err(e);
            }
        }
        self.publish(&st);
        Ok(())
    }

    fn start_poll(self: &Arc<Self>, job_id: String, attempt: u64) -> PollHandle {
        let device_id = (!self.authenticated).then(|| self.device_id.clone());
        let on_completed = {
            let shared = Arc::downgrade(self);
            move |url| finish_job(&shared, attempt, ViewEvent::JobCompleted(url))
        };
        let on_failed = {
            let shared = Arc::downgrade(self);
            move |msg| finish_job(&shared, attempt, ViewEvent::JobFailed(msg))
        };
        self.poller
            .start_polling(job_id, device_id, on_completed, on_failed)
    }

    fn schedule_signup_redirect(self: &Arc<Self>) {
        let shared = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();
        let delay = self.redirect_delay;
        info!("free quota exhausted, redirecting to sign-up in {:?}", delay);

        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let Some(shared) = shared.upgrade() else { return };
                    let mut st = shared.state.lock();
                    if st.closed {
                        return;
                    }
                    st.view.apply(ViewEvent::RedirectToSignUp);
                    shared.publish(&st);
                }
            }
        });
    }

    fn close(&self) {
        let mut st = self.state.lock();
        if st.closed {
            return;
        }
        st.closed = true;
        if let Some(poll) = st.poll.take() {
            poll.cancel();
        }
        self.shutdown.cancel();
        debug!("session closed");
    }
}

fn finish_job<B: Backend + ?Sized + 'static>(
    shared: &Weak<Shared<B>>,
    attempt: u64,
    event: ViewEvent,
) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let mut st = shared.state.lock();
    if st.closed || st.attempt != attempt {
        return;
    }
    st.poll = None;
    st.view.apply(event);
    shared.publish(&st);
}
