use thiserror::Error;

#[derive(Error, Debug)]
pub enum RatingError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No rating plugin registered for product type: {product_type}")]
    PluginNotRegistered { product_type: String },

    #[error("Product type '{product_type}' is already registered to plugin '{plugin}'")]
    DuplicateProductType { product_type: String, plugin: String },

    #[error("No active rate table for product type '{product_type}' (version: {version})")]
    RateTableMissing { product_type: String, version: String },

    #[error("Rate table {product_type}@{version} has no {kind} row for '{key}'")]
    MissingRateRow {
        product_type: String,
        version:      String,
        kind:         &'static str,
        key:          String,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Plugin '{plugin}' panicked: {message}")]
    PluginPanicked { plugin: String, message: String },

    #[error("Rating run '{run_id}' not found")]
    RunNotFound { run_id: String },

    #[error("Rating store lock poisoned")]
    StorePoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RatingError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field:  field.into(),
            reason: reason.into(),
        }
    }
}

pub type RatingResult<T> = Result<T, RatingError>;
