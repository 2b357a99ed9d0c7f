// Core ADB types and traits
use super::error::AdbResult;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ImageCapture {
    pub bytes: Vec<u8>,
    pub duration_ms: u128,
}

/// Everything a playbook action needs from a device: screenshots, input
/// injection and a shell. Backends implement the required methods; app
/// lifecycle and key events are expressed on top of `shell`.
#[allow(async_fn_in_trait)]
pub trait DeviceControl {
    /// Raw PNG bytes of the current display.
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>>;

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()>;

    async fn swipe(
        &self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration_ms: Option<u32>,
    ) -> AdbResult<()>;

    /// Run `cmd` through the device shell and return stdout.
    async fn shell(&self, cmd: &str) -> AdbResult<String>;

    fn screen_dimensions(&self) -> (u32, u32);

    fn device_name(&self) -> &str;

    async fn screen_capture(&self) -> AdbResult<ImageCapture> {
        let start = std::time::Instant::now();
        let bytes = self.screen_capture_bytes().await?;
        Ok(ImageCapture {
            bytes,
            duration_ms: start.elapsed().as_millis(),
        })
    }

    async fn key_event(&self, code: u32) -> AdbResult<()> {
        self.shell(&format!("input keyevent {code}")).await.map(|_| ())
    }

    async fn input_text(&self, text: &str) -> AdbResult<()> {
        // `input text` treats a space as an argument separator
        let escaped = text.replace(' ', "%s");
        self.shell(&format!("input text {escaped}")).await.map(|_| ())
    }

    async fn is_app_running(&self, package: &str) -> AdbResult<bool> {
        // pidof exits non-zero when nothing matches
        let pid = self.shell(&format!("pidof {package} || true")).await?;
        Ok(!pid.trim().is_empty())
    }

    async fn start_app(&self, package: &str) -> AdbResult<()> {
        self.shell(&format!(
            "monkey -p {package} -c android.intent.category.LAUNCHER 1"
        ))
        .await
        .map(|_| ())
    }

    async fn stop_app(&self, package: &str) -> AdbResult<()> {
        self.shell(&format!("am force-stop {package}"))
            .await
            .map(|_| ())
    }
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Device {
    pub name: String,
    pub transport_id: Option<String>,
}

/// Android key codes used by the playbooks.
pub mod keycode {
    pub const BACK: u32 = 4;
    /// Turns the screen on; no effect when it already is
    pub const WAKEUP: u32 = 224;
}

/// Parse the output of `wm size`, preferring an override size when present.
pub fn parse_screen_size(stdout: &str) -> Option<(u32, u32)> {
    let mut physical = None;
    for line in stdout.lines() {
        let line = line.trim();
        let (is_override, size_str) = if let Some(rest) = line.strip_prefix("Override size: ") {
            (true, rest)
        } else if let Some(rest) = line.strip_prefix("Physical size: ") {
            (false, rest)
        } else {
            continue;
        };
        let parts: Vec<&str> = size_str.trim().split('x').collect();
        if parts.len() != 2 {
            continue;
        }
        if let (Ok(x), Ok(y)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>()) {
            if is_override {
                return Some((x, y));
            }
            physical = Some((x, y));
        }
    }
    physical
}
