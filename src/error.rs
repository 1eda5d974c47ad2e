use reqwest::StatusCode;

/// Failures that abort the whole run. Per-record problems never surface here;
/// they are logged and counted by the pipeline instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("destination store unreachable: {0:#}")]
    Connectivity(anyhow::Error),
    #[error("catalog fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Ways the single catalog listing request can fail.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("upstream reported an error: {0}")]
    Api(String),
    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}
