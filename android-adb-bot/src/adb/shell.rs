use super::error::{AdbError, AdbResult};
use super::types::{Device, DeviceControl, parse_screen_size};
use tokio::process::Command;

/// Backend driving the external `adb` binary. Every command is scoped to
/// one device with `-s <serial>` so several sessions can run side by side.
pub struct AdbShell {
    pub device: Device,
    pub screen_x: u32,
    pub screen_y: u32,
}

impl AdbShell {
    fn ensure_adb_available() -> AdbResult<()> {
        match std::process::Command::new("adb").arg("version").output() {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(AdbError::CommandFailed {
                command: "adb version".into(),
                stderr: format!(
                    "returned {} ({})",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AdbError::AdbBinaryNotFound),
            Err(e) => Err(AdbError::SpawnFailed {
                command: "adb version".into(),
                source: e,
            }),
        }
    }

    /// Run `adb <args>` and return stdout, mapping a non-zero exit to
    /// `CommandFailed`.
    async fn run_adb(args: &[&str]) -> AdbResult<Vec<u8>> {
        let command = format!("adb {}", args.join(" "));
        let output = Command::new("adb")
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AdbError::AdbBinaryNotFound
                } else {
                    AdbError::SpawnFailed {
                        command: command.clone(),
                        source: e,
                    }
                }
            })?;
        if !output.status.success() {
            return Err(AdbError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    async fn run_device(&self, args: &[&str]) -> AdbResult<Vec<u8>> {
        let mut full = vec!["-s", self.device.name.as_str()];
        full.extend_from_slice(args);
        Self::run_adb(&full).await
    }

    pub fn parse_devices(output: &str) -> Vec<Device> {
        output
            .lines()
            .skip(1)
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 2 && parts[1] == "device" {
                    let name = parts[0].to_string();
                    let transport_id = parts
                        .iter()
                        .find_map(|part| part.strip_prefix("transport_id:"))
                        .map(str::to_string);
                    Some(Device { name, transport_id })
                } else {
                    None
                }
            })
            .collect()
    }

    pub async fn list_devices() -> AdbResult<Vec<Device>> {
        Self::ensure_adb_available()?;
        let stdout = Self::run_adb(&["devices", "-l"]).await?;
        Ok(Self::parse_devices(&String::from_utf8_lossy(&stdout)))
    }

    /// Open a session on `device_name`. Network addresses (`host:port`) that
    /// are not yet attached are connected first with `adb connect`.
    pub async fn new_with_device(device_name: &str) -> AdbResult<Self> {
        Self::ensure_adb_available()?;
        let mut devices = Self::list_devices().await?;
        if !devices.iter().any(|d| d.name == device_name) {
            let stdout = Self::run_adb(&["connect", device_name]).await?;
            let out = String::from_utf8_lossy(&stdout).to_string();
            if out.contains("Connection refused") || out.contains("failed") {
                return Err(AdbError::ConnectFailed {
                    name: device_name.to_string(),
                    output: out.trim().to_string(),
                });
            }
            devices = Self::list_devices().await?;
        }
        let device = devices
            .into_iter()
            .find(|d| d.name == device_name)
            .ok_or_else(|| AdbError::DeviceNotFound {
                name: device_name.to_string(),
            })?;

        let mut shell = Self {
            device,
            screen_x: 0,
            screen_y: 0,
        };
        let size = shell.run_device(&["shell", "wm", "size"]).await?;
        let (sx, sy) = parse_screen_size(&String::from_utf8_lossy(&size))
            .ok_or(AdbError::ScreenSizeParseFailed)?;
        shell.screen_x = sx;
        shell.screen_y = sy;
        Ok(shell)
    }

    fn check_bounds(&self, x: u32, y: u32) -> AdbResult<()> {
        if x >= self.screen_x || y >= self.screen_y {
            return Err(AdbError::OutOfBounds { x, y });
        }
        Ok(())
    }

    pub async fn disconnect(self) -> AdbResult<()> {
        // Only network devices have something to disconnect
        if self.device.name.contains(':') {
            Self::run_adb(&["disconnect", &self.device.name]).await?;
        }
        Ok(())
    }
}

impl DeviceControl for AdbShell {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        self.run_device(&["exec-out", "screencap", "-p"]).await
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        self.check_bounds(x, y)?;
        let (xs, ys) = (x.to_string(), y.to_string());
        self.run_device(&["shell", "input", "tap", &xs, &ys])
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
            "shell".into(),
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
        self.run_device(&refs).await.map(|_| ())
    }

    async fn shell(&self, cmd: &str) -> AdbResult<String> {
        let stdout = self.run_device(&["shell", cmd]).await?;
        Ok(String::from_utf8_lossy(&stdout).to_string())
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.screen_x, self.screen_y)
    }

    fn device_name(&self) -> &str {
        &self.device.name
    }
}
