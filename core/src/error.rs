use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValleyError>;

#[derive(Error, Debug)]
pub enum ValleyError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Buffer could not be reserved; generation stops here
    #[error("Allocation failure: could not reserve {len} {what}")]
    AllocationFailure { what: &'static str, len: usize },

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Path slot {index} was never assigned")]
    IncompletePath { index: usize },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl ValleyError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ValleyError::InvalidArgument(msg.into())
    }
}

// Reserve exactly `len` elements or report an allocation failure
pub(crate) fn try_alloc<T>(len: usize, what: &'static str) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ValleyError::AllocationFailure { what, len })?;
    Ok(buf)
}
