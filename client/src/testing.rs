//! Scripted in-memory backend for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{
    backend::Backend,
    error::{Error, Result},
    types::{DeviceId, GenerationJob, GenerationRequest, JobStatus, SubmitOutcome, Tier},
    upload::SourceFile,
};

/// A scripted answer, either ready or released later by the test.
pub(crate) enum Scripted<T> {
    Ready(Result<T>),
    Gated(oneshot::Receiver<Result<T>>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> Result<T> {
        match self {
            Scripted::Ready(r) => r,
            Scripted::Gated(rx) => rx
                .await
                .unwrap_or_else(|_| Err(Error::UnexpectedResponse("gate dropped".into()))),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    uploads: Mutex<VecDeque<Scripted<String>>>,
    upload_calls: Mutex<Vec<String>>,
    generates: Mutex<VecDeque<Scripted<SubmitOutcome>>>,
    generate_calls: Mutex<Vec<Tier>>,
    requests: Mutex<Vec<GenerationRequest>>,
    statuses: Mutex<VecDeque<Result<GenerationJob>>>,
    status_calls: Mutex<Vec<(String, Option<DeviceId>)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_upload(&self, result: Result<String>) {
        self.uploads.lock().push_back(Scripted::Ready(result));
    }

    /// Scripts an upload that completes when the returned sender fires.
    pub fn push_upload_gate(&self) -> oneshot::Sender<Result<String>> {
        let (tx, rx) = oneshot::channel();
        self.uploads.lock().push_back(Scripted::Gated(rx));
        tx
    }

    pub fn push_generate(&self, result: Result<SubmitOutcome>) {
        self.generates.lock().push_back(Scripted::Ready(result));
    }

    pub fn push_generate_gate(&self) -> oneshot::Sender<Result<SubmitOutcome>> {
        let (tx, rx) = oneshot::channel();
        self.generates.lock().push_back(Scripted::Gated(rx));
        tx
    }

    pub fn push_status(&self, result: Result<GenerationJob>) {
        self.statuses.lock().push_back(result);
    }

    pub fn upload_calls(&self) -> Vec<String> {
        self.upload_calls.lock().clone()
    }

    pub fn generate_calls(&self) -> Vec<Tier> {
        self.generate_calls.lock().clone()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.lock().len()
    }

    pub fn status_call_args(&self) -> Vec<(String, Option<DeviceId>)> {
        self.status_calls.lock().clone()
    }
}

/// Builds a job snapshot.
pub(crate) fn job(id: &str, status: JobStatus) -> GenerationJob {
    GenerationJob {
        id: id.to_string(),
        status,
        output_image_url: None,
        error_message: None,
    }
}

pub(crate) fn completed(id: &str, output: &str) -> GenerationJob {
    GenerationJob {
        output_image_url: Some(output.to_string()),
        ..job(id, JobStatus::Completed)
    }
}

pub(crate) fn failed(id: &str, message: Option<&str>) -> GenerationJob {
    GenerationJob {
        error_message: message.map(str::to_string),
        ..job(id, JobStatus::Failed)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn upload(&self, file: &SourceFile) -> Result<String> {
        self.upload_calls.lock().push(file.name().to_string());
        let scripted = self.uploads.lock().pop_front();
        match scripted {
            Some(s) => s.resolve().await,
            None => Ok(format!("/storage/{}", file.name())),
        }
    }

    async fn generate(&self, tier: Tier, request: &GenerationRequest) -> Result<SubmitOutcome> {
        self.generate_calls.lock().push(tier);
        self.requests.lock().push(request.clone());
        let scripted = self.generates.lock().pop_front();
        match scripted {
            Some(s) => s.resolve().await,
            None => Err(Error::UnexpectedResponse("no scripted response".into())),
        }
    }

    async fn generation_status(
        &self,
        job_id: &str,
        device_id: Option<&DeviceId>,
    ) -> Result<GenerationJob> {
        self.status_calls
            .lock()
            .push((job_id.to_string(), device_id.cloned()));
        let scripted = self.statuses.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(job(job_id, JobStatus::Processing)))
    }
}
