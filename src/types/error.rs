/// Convenience result type used across the booth.
pub type BoothResult<T> = Result<T, BoothError>;

/// Top-level error taxonomy for the photo booth.
///
/// Every variant recovers locally: the session falls back to a known-good
/// phase and a full reset is always available.
#[derive(thiserror::Error, Debug)]
pub enum BoothError {
    /// Camera access denied or the device is unavailable.
    #[error("camera error: {0}")]
    Camera(String),

    /// A still frame could not be read from the active video source.
    #[error("capture error: {0}")]
    Capture(String),

    /// Rasterization or encoding failed while producing the strip.
    #[error("compose error: {0}")]
    Compose(String),

    /// Writing the finished strip to disk failed.
    #[error("save error: {0}")]
    Save(#[from] std::io::Error),
}

impl BoothError {
    /// Build a [`BoothError::Camera`] value.
    pub fn camera(msg: impl Into<String>) -> Self {
        Self::Camera(msg.into())
    }

    /// Build a [`BoothError::Capture`] value.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Build a [`BoothError::Compose`] value.
    pub fn compose(msg: impl Into<String>) -> Self {
        Self::Compose(msg.into())
    }
}
