use reqwest::multipart::Form;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::ClientError;

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// POST a multipart form and decode the JSON reply.
///
/// Non-2xx replies become [`ClientError::Server`], carrying the body's
/// `error` field when it is JSON and has one.
pub(crate) async fn post_form<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    form: Form,
) -> Result<T, ClientError> {
    let resp = client.post(url).multipart(form).send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);
        warn!(url = %url, status = status.as_u16(), error = ?message, "request rejected");
        return Err(ClientError::Server {
            status: status.as_u16(),
            message,
        });
    }
    info!(url = %url, status = status.as_u16(), bytes = body.len(), "response received");
    Ok(serde_json::from_str(&body)?)
}
