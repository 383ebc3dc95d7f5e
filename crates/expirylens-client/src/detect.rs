use expirylens_core::Detection;
use reqwest::multipart::Form;
use serde::Deserialize;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::post_form;
use crate::upload::ImageUpload;

/// Reply from `POST /detect`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectResponse {
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// Source image size in pixels; box coordinates are relative to it.
    #[serde(default)]
    pub image_width: u32,
    #[serde(default)]
    pub image_height: u32,
    /// Where the service stored the upload, e.g. `/static/uploads/upload_..jpg`.
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Client for the date-region detection endpoint.
pub struct DetectionClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl DetectionClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Upload an image and return the regions the service found.
    pub async fn detect(&self, upload: &ImageUpload) -> Result<DetectResponse, ClientError> {
        let url = self.config.endpoint("detect");
        info!(url = %url, file = upload.file_name(), bytes = upload.len(), "requesting detection");
        let form = Form::new().part("file", upload.part()?);
        let resp: DetectResponse = post_form(&self.client, &url, form).await?;
        info!(
            count = resp.detections.len(),
            width = resp.image_width,
            height = resp.image_height,
            "detection complete"
        );
        Ok(resp)
    }
}
