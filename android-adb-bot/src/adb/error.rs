use thiserror::Error;

/// A specialized `Result` type for ADB operations.
pub type AdbResult<T> = Result<T, AdbError>;

/// The error type for all ADB-related operations.
///
/// Every variant except `OutOfBounds` is fatal for the device session that
/// produced it: the worker owning that session stops, other sessions keep
/// running.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error(
        "'adb' binary not found in PATH. Install Android Platform Tools or run with --impl=rust."
    )]
    AdbBinaryNotFound,

    #[error("Failed to invoke '{command}': {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("Command '{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("ADB server request failed: {source}")]
    Client {
        #[from]
        source: adb_client::RustADBError,
    },

    #[error("Shell command '{command}' failed: {source}")]
    ShellCommandFailed {
        command: String,
        source: adb_client::RustADBError,
    },

    #[error("Device '{name}' not found")]
    DeviceNotFound { name: String },

    #[error("No devices available")]
    NoDevices,

    #[error("adb connect {name} failed: {output}")]
    ConnectFailed { name: String, output: String },

    #[error("Operation timed out after {duration:?}: {description}")]
    Timeout {
        duration: std::time::Duration,
        description: String,
    },

    #[error("Task failed to complete: {source}")]
    JoinError {
        #[from]
        source: tokio::task::JoinError,
    },

    #[error("Could not parse screen size from 'wm size' output.")]
    ScreenSizeParseFailed,

    #[error("Input coordinates are out of bounds: x={x}, y={y}")]
    OutOfBounds { x: u32, y: u32 },
}
