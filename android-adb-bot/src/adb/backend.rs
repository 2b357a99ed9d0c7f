use super::error::AdbResult;
use super::rust_impl::RustAdb;
use super::shell::AdbShell;
use super::types::{Device, DeviceControl};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Which ADB implementation a session talks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackendKind {
    /// External `adb` binary.
    Shell,
    /// `adb_client` against the ADB server.
    Rust,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shell" => Ok(BackendKind::Shell),
            "rust" => Ok(BackendKind::Rust),
            other => Err(format!(
                "Unknown impl '{other}', expected 'rust' or 'shell'"
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Shell => write!(f, "shell"),
            BackendKind::Rust => write!(f, "rust"),
        }
    }
}

/// One device session. Sessions are created with [`AdbBackend::connect`] and
/// ended with [`AdbBackend::disconnect`]; a session is never re-pointed at
/// another device in place.
pub enum AdbBackend {
    Shell(AdbShell),
    Rust(RustAdb),
}

impl AdbBackend {
    pub async fn list_devices(kind: BackendKind) -> AdbResult<Vec<Device>> {
        match kind {
            BackendKind::Rust => RustAdb::list_devices().await,
            BackendKind::Shell => AdbShell::list_devices().await,
        }
    }

    pub async fn connect(name: &str, kind: BackendKind) -> AdbResult<Self> {
        match kind {
            BackendKind::Rust => Ok(AdbBackend::Rust(RustAdb::new_with_device(name).await?)),
            BackendKind::Shell => Ok(AdbBackend::Shell(AdbShell::new_with_device(name).await?)),
        }
    }

    pub async fn disconnect(self) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.disconnect().await,
            AdbBackend::Rust(_) => Ok(()),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            AdbBackend::Shell(_) => BackendKind::Shell,
            AdbBackend::Rust(_) => BackendKind::Rust,
        }
    }
}

impl DeviceControl for AdbBackend {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        match self {
            AdbBackend::Shell(s) => s.screen_capture_bytes().await,
            AdbBackend::Rust(r) => r.screen_capture_bytes().await,
        }
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.tap(x, y).await,
            AdbBackend::Rust(r) => r.tap(x, y).await,
        }
    }

    async fn swipe(
        &self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration_ms: Option<u32>,
    ) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.swipe(x1, y1, x2, y2, duration_ms).await,
            AdbBackend::Rust(r) => r.swipe(x1, y1, x2, y2, duration_ms).await,
        }
    }

    async fn shell(&self, cmd: &str) -> AdbResult<String> {
        match self {
            AdbBackend::Shell(s) => s.shell(cmd).await,
            AdbBackend::Rust(r) => r.shell(cmd).await,
        }
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        match self {
            AdbBackend::Shell(s) => s.screen_dimensions(),
            AdbBackend::Rust(r) => r.screen_dimensions(),
        }
    }

    fn device_name(&self) -> &str {
        match self {
            AdbBackend::Shell(s) => s.device_name(),
            AdbBackend::Rust(r) => r.device_name(),
        }
    }
}
