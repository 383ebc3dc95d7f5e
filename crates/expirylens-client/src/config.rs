pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// The detection service rejects request bodies over 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Where the services live and how large an upload may be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Like `http://localhost:5000` (a trailing slash is trimmed).
    pub base_url: String,
    pub max_upload_bytes: u64,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
