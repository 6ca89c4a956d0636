#![allow(dead_code)]
//! Resume Workflow Controller: sequences upload then analysis into one observable flow.
//!
//! Transitions:
//!
//! | From                      | Event            | To               |
//! |---------------------------|------------------|------------------|
//! | AwaitingUpload, Error     | `upload_file`    | Uploading        |
//! | Uploading                 | upload settles   | ReadyToAnalyze / Error |
//! | ReadyToAnalyze, Error (*) | `start_analysis` | Analyzing        |
//! | Analyzing                 | analysis settles | ReportReady / Error    |
//! | any                       | `reset`          | AwaitingUpload   |
//!
//! (*) only while a `file_id` is retained from an earlier upload.
//!
//! Every other event is refused with `PreconditionFailed` and leaves state untouched.
//! Each operation carries an epoch; a response settles state only if no reset or newer
//! operation happened in between and the workflow is still in the originating state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::ClientError;
use crate::resume::{ResumeApi, ResumeFile};
use crate::schema::resume::{AnalysisReport, AnalysisRequest};

const UPLOAD_FAILED: &str = "File upload failed.";
const ANALYSIS_FAILED: &str = "Analysis failed.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    #[default]
    AwaitingUpload,
    Uploading,
    ReadyToAnalyze,
    Analyzing,
    ReportReady,
    Error,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::AwaitingUpload => "AWAITING_UPLOAD",
            FlowState::Uploading => "UPLOADING",
            FlowState::ReadyToAnalyze => "READY_TO_ANALYZE",
            FlowState::Analyzing => "ANALYZING",
            FlowState::ReportReady => "REPORT_READY",
            FlowState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResumeWorkflow {
    pub state: FlowState,
    pub file_id: Option<String>,
    pub report: Option<AnalysisReport>,
    pub error: Option<String>,
}

pub struct ResumeWorkflowController {
    api: Arc<dyn ResumeApi>,
    state: watch::Sender<ResumeWorkflow>,
    epoch: AtomicU64,
}

impl ResumeWorkflowController {
    pub fn new(api: Arc<dyn ResumeApi>) -> Self {
        let (state, _) = watch::channel(ResumeWorkflow::default());
        Self {
            api,
            state,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> ResumeWorkflow {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResumeWorkflow> {
        self.state.subscribe()
    }

    /// Uploads `file`. Failures land in state as `Error`; only a refused transition returns `Err`.
    pub async fn upload_file(&self, file: ResumeFile) -> Result<(), ClientError> {
        let epoch = self.begin("upload a resume", FlowState::Uploading, |wf| {
            matches!(wf.state, FlowState::AwaitingUpload | FlowState::Error)
        })?;
        debug!("Uploading {} ({} bytes)", file.file_name(), file.len());

        let outcome = self.api.upload(&file).await;

        self.settle(epoch, FlowState::Uploading, |wf| match outcome {
            Ok(receipt) => {
                info!("Resume uploaded as {}", receipt.file_id);
                wf.file_id = Some(receipt.file_id);
                wf.state = FlowState::ReadyToAnalyze;
            }
            Err(e) => {
                warn!("Resume upload failed: {e}");
                wf.error = Some(e.user_message(UPLOAD_FAILED));
                wf.state = FlowState::Error;
            }
        });
        Ok(())
    }

    /// Analyzes the uploaded resume against `request.job_url`.
    ///
    /// Request validity (non-empty file id, well-formed URL) is enforced when the
    /// `AnalysisRequest` is built, so nothing invalid reaches the network.
    pub async fn start_analysis(&self, request: AnalysisRequest) -> Result<(), ClientError> {
        let epoch = self.begin("start an analysis", FlowState::Analyzing, |wf| {
            match wf.state {
                FlowState::ReadyToAnalyze => true,
                FlowState::Error => wf.file_id.is_some(),
                _ => false,
            }
        })?;
        debug!(
            "Analyzing {} against {}",
            request.file_id(),
            request.job_url()
        );

        let outcome = self.api.analyze(&request).await;

        self.settle(epoch, FlowState::Analyzing, |wf| match outcome {
            Ok(report) => {
                info!("Analysis ready, match score {:.1}", report.match_score);
                wf.report = Some(report);
                wf.state = FlowState::ReportReady;
            }
            Err(e) => {
                warn!("Analysis failed: {e}");
                wf.error = Some(e.user_message(ANALYSIS_FAILED));
                wf.state = FlowState::Error;
            }
        });
        Ok(())
    }

    /// Returns every field to its initial value. In-flight responses are discarded on arrival.
    pub fn reset(&self) {
        self.state.send_modify(|wf| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *wf = ResumeWorkflow::default();
        });
        debug!("Resume workflow reset");
    }

    /// Enters `next` if `allowed` holds for the current state, clearing `error`.
    fn begin(
        &self,
        action: &str,
        next: FlowState,
        allowed: impl FnOnce(&ResumeWorkflow) -> bool,
    ) -> Result<u64, ClientError> {
        let mut started = Err(FlowState::default());
        self.state.send_if_modified(|wf| {
            if !allowed(&*wf) {
                started = Err(wf.state);
                return false;
            }
            started = Ok(self.epoch.fetch_add(1, Ordering::SeqCst) + 1);
            wf.state = next;
            wf.error = None;
            true
        });
        started.map_err(|current| {
            ClientError::precondition(format!("Cannot {action} while the workflow is {current}"))
        })
    }

    /// Applies `apply` only if `epoch` is still current and the state is still `origin`.
    fn settle(&self, epoch: u64, origin: FlowState, apply: impl FnOnce(&mut ResumeWorkflow)) {
        self.state.send_if_modified(|wf| {
            if self.epoch.load(Ordering::SeqCst) != epoch || wf.state != origin {
                debug!("Discarding stale {origin} response (epoch {epoch})");
                return false;
            }
            apply(wf);
            true
        });
    }
}
