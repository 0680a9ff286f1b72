pub type GenesisResult<T> = Result<T, GenesisError>;

/// Error taxonomy shared by the encode and decode pipelines.
///
/// `Decode` is the only per-frame class: the reconstructor recovers from it locally and it only
/// escapes from direct calls to `reconstruct_block`. Every other variant is fatal.
#[derive(thiserror::Error, Debug)]
pub enum GenesisError {
    #[error("open error: {0}")]
    Open(String),

    #[error("format error in `{field}`: {msg}")]
    Format { field: String, msg: String },

    #[error("decode error at frame {frame}: {msg}")]
    Decode { frame: usize, msg: String },

    #[error("sink open error: {0}")]
    SinkOpen(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("sink error: {0}")]
    Sink(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GenesisError {
    pub fn open(msg: impl Into<String>) -> Self {
        Self::Open(msg.into())
    }

    pub fn format(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Format {
            field: field.into(),
            msg: msg.into(),
        }
    }

    pub fn decode(frame: usize, msg: impl Into<String>) -> Self {
        Self::Decode {
            frame,
            msg: msg.into(),
        }
    }

    pub fn sink_open(msg: impl Into<String>) -> Self {
        Self::SinkOpen(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
