use thiserror::Error as ThisError;

/// Failures of a single catalog fetch. `Network` and `Status` are both network failures.
#[derive(ThisError, Debug)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    #[error("could not parse countries document")]
    Parse,
}

impl CatalogError {
    pub fn is_network(&self) -> bool {
        matches!(self, CatalogError::Network(_) | CatalogError::Status(_))
    }
}
