use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValuationError {
    /// Terminal condition: not enough usable comparables to defend a value.
    #[error("Insufficient data: {found} valid comparables after {stage}, at least {required} required")]
    InsufficientComparables {
        found: usize,
        required: usize,
        stage: &'static str,
    },

    #[error("Invalid target property: {0}")]
    InvalidTarget(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ValuationError {
    /// Whether the caller should surface this as "not enough market data" to the end user.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ValuationError::InsufficientComparables { .. })
    }
}

pub type Result<T> = std::result::Result<T, ValuationError>;
