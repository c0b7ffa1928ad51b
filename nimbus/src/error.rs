use std::io;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("index out of range: {index} (len = {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid capture: {0}")]
    InvalidCapture(String),

    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    #[error("operation has been cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(Self::IndexOutOfRange { index, len })
        }
    }
}
