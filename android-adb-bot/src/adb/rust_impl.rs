// https://crates.io/crates/adb_client
use super::error::{AdbError, AdbResult};
use super::types::{Device, DeviceControl, parse_screen_size};
use adb_client::{ADBDeviceExt, ADBServer, ADBServerDevice};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const INPUT_TIMEOUT: Duration = Duration::from_secs(5);
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend talking to the ADB server directly through `adb_client`.
///
/// `adb_client` is blocking, so every device call runs on the blocking pool
/// and is wrapped in a timeout; a timeout is how a pulled cable shows up.
pub struct RustAdb {
    device: Device,
    server_device: Arc<Mutex<ADBServerDevice>>,
    screen_x: u32,
    screen_y: u32,
}

impl RustAdb {
    pub async fn list_devices() -> AdbResult<Vec<Device>> {
        let mut server = ADBServer::default();
        let device_list = tokio::task::spawn_blocking(move || server.devices()).await??;
        Ok(device_list
            .into_iter()
            .map(|d| Device {
                name: d.identifier,
                transport_id: None,
            })
            .collect())
    }

    pub async fn new_with_device(device_name: &str) -> AdbResult<Self> {
        let mut server = ADBServer::default();
        let name = device_name.to_string();
        let server_device = tokio::task::spawn_blocking(move || {
            if name.is_empty() {
                server.get_device()
            } else {
                server.get_device_by_name(&name)
            }
        })
        .await?
        .map_err(|_| AdbError::DeviceNotFound {
            name: device_name.to_string(),
        })?;

        let mut adb = RustAdb {
            device: Device {
                name: device_name.to_string(),
                transport_id: None,
            },
            server_device: Arc::new(Mutex::new(server_device)),
            screen_x: 0,
            screen_y: 0,
        };
        let out = adb.run_shell(&["wm", "size"], INPUT_TIMEOUT).await?;
        let (sx, sy) =
            parse_screen_size(&String::from_utf8_lossy(&out)).ok_or(AdbError::ScreenSizeParseFailed)?;
        adb.screen_x = sx;
        adb.screen_y = sy;
        Ok(adb)
    }

    /// Run a shell command on the blocking pool, bounded by `limit`.
    async fn run_shell(&self, parts: &[&str], limit: Duration) -> AdbResult<Vec<u8>> {
        let server_device = Arc::clone(&self.server_device);
        let owned: Vec<String> = parts.iter().map(|s| s.to_string()).collect();
        let command = owned.join(" ");
        let task = tokio::task::spawn_blocking(move || -> AdbResult<Vec<u8>> {
            let mut out: Vec<u8> = Vec::new();
            let mut dev = server_device.blocking_lock();
            let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
            dev.shell_command(&refs, &mut out)
                .map_err(|source| AdbError::ShellCommandFailed {
                    command: owned.join(" "),
                    source,
                })?;
            Ok(out)
        });

        match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(AdbError::Timeout {
                duration: limit,
                description: command,
            }),
        }
    }

    fn check_bounds(&self, x: u32, y: u32) -> AdbResult<()> {
        if x >= self.screen_x || y >= self.screen_y {
            return Err(AdbError::OutOfBounds { x, y });
        }
        Ok(())
    }
}

impl DeviceControl for RustAdb {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        self.run_shell(&["screencap", "-p"], CAPTURE_TIMEOUT).await
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        self.check_bounds(x, y)?;
        let (xs, ys) = (x.to_string(), y.to_string());
        self.run_shell(&["input", "tap", &xs, &ys], INPUT_TIMEOUT)
            .await
            .map(|_| ())
    }

    async fn swipe(
        &self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration_ms: Option<u32>,
    ) -> AdbResult<()> {
        for &(x, y) in &[(x1, y1), (x2, y2)] {
            self.check_bounds(x, y)?;
        }
        let mut parts: Vec<String> = vec![
            "input".into(),
            "swipe".into(),
            x1.to_string(),
            y1.to_string(),
            x2.to_string(),
            y2.to_string(),
        ];
        if let Some(d) = duration_ms {
            parts.push(d.to_string());
        }
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        // A long hold keeps the shell busy for the whole gesture
        let limit = INPUT_TIMEOUT + Duration::from_millis(duration_ms.unwrap_or(0) as u64);
        self.run_shell(&refs, limit).await.map(|_| ())
    }

    async fn shell(&self, cmd: &str) -> AdbResult<String> {
        // The server joins the arguments into one command line, so the whole
        // command goes through as a single argument
        let out = self.run_shell(&[cmd], INPUT_TIMEOUT).await?;
        Ok(String::from_utf8_lossy(&out).to_string())
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.screen_x, self.screen_y)
    }

    fn device_name(&self) -> &str {
        &self.device.name
    }
}
