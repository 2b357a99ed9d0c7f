// ADB module - device sessions over the Android Debug Bridge.
// Two interchangeable backends: the external `adb` binary and the pure Rust
// `adb_client` talking to the ADB server.

pub mod backend;
pub mod error;
pub mod rust_impl;
pub mod shell;
pub mod types;

#[cfg(test)]
pub mod mock;


// Re-export the main types and functions for easy access
pub use backend::{AdbBackend, BackendKind};
pub use error::{AdbError, AdbResult};
pub use types::{Device, DeviceControl, ImageCapture, keycode};
