pub type IconforgeResult<T> = Result<T, IconforgeError>;

#[derive(thiserror::Error, Debug)]
pub enum IconforgeError {
    /// A surface was requested with a zero-width or zero-height extent.
    /// Fatal to the render pass that raised it.
    #[error("invalid dimension: {0}")]
    Dimension(String),

    /// A blit was requested with a zero-area source or destination rect.
    /// Recovered locally by UI-facing callers (the blit is skipped).
    #[error("invalid geometry: {0}")]
    Geometry(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// Source imagery could not be decoded. Propagated to the caller of the
    /// render pass; never silently replaced with a blank image.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    /// A trim scan was superseded by a newer request. Callers discard the
    /// ticket's result; this is a signal, not a failure of the pipeline.
    #[error("trim scan cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IconforgeError {
    pub fn dimension(msg: impl Into<String>) -> Self {
        Self::Dimension(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
