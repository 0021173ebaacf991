use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaceTileError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API returned status {status} for {url}")]
    Api { status: u16, url: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Location not found: '{0}'. Try a more specific name or address")]
    LocationNotFound(String),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Search worker failed: {0}")]
    Worker(String),
}

impl PlaceTileError {
    /// True for failures of a provider request: transport, status or body.
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Json(_) | Self::Api { .. })
    }
}
