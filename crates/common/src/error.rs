//! Error types shared across ChronoSketch crates.

/// Top-level error type for ChronoSketch operations.
#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Document store is not initialized")]
    StoreUnavailable,

    #[error("Malformed import: {message}")]
    MalformedImport { message: String },

    #[error("Unrecognized document format: {message}")]
    UnknownFormat { message: String },

    #[error("Invalid stroke: {message}")]
    InvalidStroke { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SketchError.
pub type SketchResult<T> = Result<T, SketchError>;

impl SketchError {
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence {
            message: msg.into(),
        }
    }

    pub fn malformed_import(msg: impl Into<String>) -> Self {
        Self::MalformedImport {
            message: msg.into(),
        }
    }

    pub fn unknown_format(msg: impl Into<String>) -> Self {
        Self::UnknownFormat {
            message: msg.into(),
        }
    }

    pub fn invalid_stroke(msg: impl Into<String>) -> Self {
        Self::InvalidStroke {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    /// Whether this error means the document could not be understood at all.
    ///
    /// Import paths use this to decide between "rejected, nothing changed"
    /// and "failed midway" notices.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Self::MalformedImport { .. } | Self::UnknownFormat { .. } | Self::Json(_)
        )
    }
}
