use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download error: {0}")]
    Download(#[from] stitch_engine::StitchError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Download(stitch_engine::StitchError::Cancelled))
    }
}
