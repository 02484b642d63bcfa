use crate::remote::RemoteError;
use crate::session::SessionError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("a remote request is already in flight")]
    Busy,
    #[error("document has no file path yet; use save-as")]
    NoSavePath,
}
