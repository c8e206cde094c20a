/// Convenience result type used across avatarcast.
pub type AvatarResult<T> = Result<T, AvatarError>;

/// Top-level error taxonomy used by the renderer APIs.
#[derive(thiserror::Error, Debug)]
pub enum AvatarError {
    /// Invalid user-provided model or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing, unreadable or undecodable image assets.
    #[error("asset error: {0}")]
    Asset(String),

    /// Failures while compositing, encoding or driving the render loop.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AvatarError {
    /// Build an [`AvatarError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an [`AvatarError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build an [`AvatarError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build an [`AvatarError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
