//! Submission orchestration: detect, render, analyze, render.
//!
//! A [`Presenter`] owns the selected image and the latest [`Session`]. Each
//! submission takes a sequence number up front; when it finishes, its
//! session replaces the current one only if no newer submission has started
//! in the meantime. Older results are dropped and reported as
//! [`SubmitOutcome::Superseded`].

use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use expirylens_client::{AnalysisClient, ClientConfig, DetectionClient, ImageUpload, UploadError};
use expirylens_core::{AnnotatedDetection, Detection, annotate};
use thiserror::Error;
use tracing::{info, warn};

use crate::render::{AnalysisView, DetectionView, ScaledBox, analysis_view, detection_view, scale_boxes};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Please select an image first")]
    NoFileSelected,
    /// The chosen file is unreadable, empty, or over the upload limit.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Detecting,
    Detected,
    Analyzing,
    Done,
    /// Finished, but detection or analysis failed along the way.
    DoneWithError,
}

/// Everything shown for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub file_name: String,
    pub detection: DetectionView,
    /// Empty unless detection returned at least one region.
    pub boxes: Vec<ScaledBox>,
    pub analysis: AnalysisView,
    pub phase: Phase,
}

/// Immutable snapshot of the latest applied submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub sequence: u64,
    pub detections: Vec<AnnotatedDetection>,
    pub image_width: u32,
    pub image_height: u32,
    pub image_path: Option<String>,
    pub report: Report,
}

impl Session {
    /// Boxes for the image shown at a new width.
    pub fn boxes_at(&self, display_width: Option<f64>) -> Vec<ScaledBox> {
        scale_boxes(&self.detections, self.image_width, display_width)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Applied(Arc<Session>),
    /// A newer submission started before this one finished.
    Superseded { sequence: u64 },
}

type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

struct State {
    selected: Option<ImageUpload>,
    session: Option<Arc<Session>>,
    phase: Phase,
    display_width: Option<f64>,
}

pub struct Presenter {
    detector: DetectionClient,
    analyzer: AnalysisClient,
    clock: Clock,
    max_upload_bytes: u64,
    sequence: AtomicU64,
    in_flight: AtomicUsize,
    state: Mutex<State>,
}

impl Presenter {
    pub fn new(config: ClientConfig) -> Self {
        let client = reqwest::Client::new();
        let max_upload_bytes = config.max_upload_bytes;
        Self {
            detector: DetectionClient::with_client(client.clone(), config.clone()),
            analyzer: AnalysisClient::with_client(client, config),
            clock: Arc::new(Local::now),
            max_upload_bytes,
            sequence: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            state: Mutex::new(State {
                selected: None,
                session: None,
                phase: Phase::Idle,
                display_width: None,
            }),
        }
    }

    /// Replace the clock used for local expiry evaluation.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Local> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Select an image. Clears the current session; submissions still in
    /// flight come back as [`SubmitOutcome::Superseded`].
    pub fn select(&self, upload: ImageUpload) {
        self.reset(Some(upload));
    }

    /// Load and select an image from disk.
    ///
    /// On failure nothing stays selected, so a following [`submit`](Self::submit)
    /// is rejected instead of sending the previous image.
    pub async fn select_path(&self, path: &Path) -> Result<(), SubmitError> {
        match ImageUpload::from_path(path, self.max_upload_bytes).await {
            Ok(upload) => {
                self.select(upload);
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "image rejected");
                self.reset(None);
                Err(e.into())
            }
        }
    }

    fn reset(&self, selected: Option<ImageUpload>) {
        let mut state = self.state();
        self.next_sequence();
        state.selected = selected;
        state.session = None;
        state.phase = Phase::Idle;
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.state().session.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Set the width the image is shown at and re-render boxes from the
    /// current session, if any.
    pub fn resize(&self, display_width: Option<f64>) -> Option<Vec<ScaledBox>> {
        let mut state = self.state();
        state.display_width = display_width;
        state.session.as_ref().map(|s| s.boxes_at(display_width))
    }

    /// Submit the selected image.
    pub async fn submit(&self) -> Result<SubmitOutcome, SubmitError> {
        let (upload, sequence) = {
            let state = self.state();
            let upload = state.selected.clone().ok_or(SubmitError::NoFileSelected)?;
            (upload, self.next_sequence())
        };
        Ok(self.run(sequence, upload).await)
    }

    /// Run detection then analysis for `upload`.
    ///
    /// Both calls always run, in order; failures are rendered, never returned.
    pub async fn submit_upload(&self, upload: ImageUpload) -> SubmitOutcome {
        let sequence = {
            let _state = self.state();
            self.next_sequence()
        };
        self.run(sequence, upload).await
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn run(&self, sequence: u64, upload: ImageUpload) -> SubmitOutcome {
        let _loading = LoadingGuard::new(&self.in_flight);
        info!(sequence, file = upload.file_name(), "submission started");

        self.set_phase(sequence, Phase::Detecting);
        let detected = self.detector.detect(&upload).await;
        if let Err(e) = &detected {
            warn!(sequence, error = %e, "detection failed");
        }
        let detection = detection_view(&detected);
        let (detections, image_width, image_height, image_path) = match &detected {
            Ok(resp) => (
                annotate(&resp.detections),
                resp.image_width,
                resp.image_height,
                resp.image_path.clone(),
            ),
            Err(_) => (Vec::new(), 0, 0, None),
        };
        self.set_phase(sequence, Phase::Detected);

        self.set_phase(sequence, Phase::Analyzing);
        let raw: Vec<Detection> = detections.iter().map(|a| a.detection.clone()).collect();
        let analyzed = self.analyzer.analyze(&upload, &raw).await;
        if let Err(e) = &analyzed {
            warn!(sequence, error = %e, "analysis failed");
        }
        let now = (self.clock)();
        let analysis = analysis_view(&analyzed, &detections, &now);

        let phase = if detection.is_error() || analysis.is_unavailable() {
            Phase::DoneWithError
        } else {
            Phase::Done
        };

        let mut state = self.state();
        if sequence != self.sequence.load(Ordering::SeqCst) {
            info!(sequence, "submission superseded, discarding result");
            return SubmitOutcome::Superseded { sequence };
        }
        let session = Arc::new(Session {
            sequence,
            report: Report {
                file_name: upload.file_name().to_string(),
                detection,
                boxes: scale_boxes(&detections, image_width, state.display_width),
                analysis,
                phase,
            },
            detections,
            image_width,
            image_height,
            image_path,
        });
        state.session = Some(session.clone());
        state.phase = phase;
        info!(sequence, phase = ?phase, "submission applied");
        SubmitOutcome::Applied(session)
    }

    fn set_phase(&self, sequence: u64, phase: Phase) {
        if sequence == self.sequence.load(Ordering::SeqCst) {
            self.state().phase = phase;
        }
    }
}

/// Keeps the loading indicator on while a submission runs.
struct LoadingGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl<'a> LoadingGuard<'a> {
    fn new(in_flight: &'a AtomicUsize) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self { in_flight }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
