//! HTTP clients for the remote detection (`/detect`) and analysis (`/analyze`) endpoints.
//!
//! Each call is a single multipart POST with no retry and no timeout.

mod analyze;
mod config;
mod detect;
mod error;
mod http;
mod upload;

#[cfg(test)]
mod testing;

pub use analyze::{AnalysisClient, AnalyzeResponse};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MAX_UPLOAD_BYTES};
pub use detect::{DetectResponse, DetectionClient};
pub use error::{ClientError, UploadError};
pub use upload::ImageUpload;
