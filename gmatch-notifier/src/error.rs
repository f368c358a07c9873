// Notifier error types

use thiserror::Error;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail configuration: {0}")]
    Config(String),

    #[error("template rendering failed: {0}")]
    Template(String),

    #[error("mail transport error: {0}")]
    Transport(String),
}
