use crate::adb::AdbError;
use std::path::PathBuf;
use thiserror::Error;

pub type AutomationResult<T> = Result<T, AutomationError>;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Device error: {0}")]
    Device(#[from] AdbError),

    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to load template {path}: {source}")]
    TemplateLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Timed out after {attempts} attempts waiting for {what}")]
    Timeout { what: String, attempts: u32 },

    #[error("Cancelled")]
    Cancelled,

    #[error("Unknown playbook '{0}', expected basic_play, init_game or unlock_phone")]
    UnknownPlaybook(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker thread failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Worker for {0} panicked")]
    WorkerPanicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutomationError {
    /// Recoverable errors end the current iteration but not the worker.
    /// A garbled screenshot counts as one.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AutomationError::Timeout { .. }
                | AutomationError::Image(_)
                | AutomationError::Device(AdbError::OutOfBounds { .. })
        )
    }

    /// Device I/O failed; nothing on this worker can continue.
    pub fn is_fatal(&self) -> bool {
        match self {
            AutomationError::Device(AdbError::OutOfBounds { .. }) => false,
            AutomationError::Device(_)
            | AutomationError::Join(_)
            | AutomationError::WorkerPanicked(_) => true,
            _ => false,
        }
    }
}
