use expirylens_core::{Detection, DetectionPayload};
use reqwest::multipart::Form;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::post_form;
use crate::upload::ImageUpload;

/// Reply from `POST /analyze`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub original_text: Option<String>,
    /// `original_text` translated to English.
    #[serde(default)]
    pub translated_text: Option<String>,
    /// Multi-line verdict, e.g. `"Expiration Date: ..\nStatus: EXPIRED\n.."`.
    #[serde(default)]
    pub analysis: Option<String>,
    /// `"success"` or `"error"`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Client for the text extraction and expiry analysis endpoint.
pub struct AnalysisClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl AnalysisClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Upload an image with the detections found for it.
    ///
    /// The `detections` field is only sent when there is at least one detection.
    pub async fn analyze(
        &self,
        upload: &ImageUpload,
        detections: &[Detection],
    ) -> Result<AnalyzeResponse, ClientError> {
        let url = self.config.endpoint("analyze");
        let mut form = Form::new().part("file", upload.part()?);
        if !detections.is_empty() {
            let payload: Vec<DetectionPayload<'_>> =
                detections.iter().map(Detection::payload).collect();
            let encoded = serde_json::to_string(&payload)?;
            debug!(detections = %encoded, "sending detections");
            form = form.text("detections", encoded);
        }
        info!(url = %url, file = upload.file_name(), detections = detections.len(), "requesting analysis");
        let resp: AnalyzeResponse = post_form(&self.client, &url, form).await?;
        info!(has_analysis = resp.analysis.is_some(), "analysis complete");
        Ok(resp)
    }
}
