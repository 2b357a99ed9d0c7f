//! In-memory device used by the tests: serves scripted screenshots and
//! records every input event it receives.

use super::error::{AdbError, AdbResult};
use super::types::DeviceControl;
use image::{GrayImage, ImageFormat};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Tap(u32, u32),
    Swipe {
        from: (u32, u32),
        to: (u32, u32),
        duration_ms: Option<u32>,
    },
    Shell(String),
}

pub struct MockDevice {
    name: String,
    width: u32,
    height: u32,
    /// Each capture returns the front screen; the front is dropped while
    /// more than one screen is queued, so the last one sticks.
    screens: Mutex<VecDeque<Vec<u8>>>,
    events: Mutex<Vec<InputEvent>>,
    running_apps: Mutex<Vec<String>>,
    fail_captures: bool,
}

pub fn encode_png(image: &GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

impl MockDevice {
    pub fn new(screen: &GrayImage) -> Self {
        Self::with_screens(&[screen.clone()])
    }

    pub fn with_screens(screens: &[GrayImage]) -> Self {
        let first = screens.first().expect("at least one screen");
        Self {
            name: "mock-device".into(),
            width: first.width(),
            height: first.height(),
            screens: Mutex::new(screens.iter().map(encode_png).collect()),
            events: Mutex::new(Vec::new()),
            running_apps: Mutex::new(Vec::new()),
            fail_captures: false,
        }
    }

    /// A device whose every screenshot fails like a pulled cable.
    pub fn disconnected(width: u32, height: u32) -> Self {
        let mut device = Self::new(&GrayImage::new(width, height));
        device.fail_captures = true;
        device
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn taps(&self) -> Vec<(u32, u32)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                InputEvent::Tap(x, y) => Some((x, y)),
                _ => None,
            })
            .collect()
    }

    pub fn input_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| !matches!(e, InputEvent::Shell(cmd) if cmd.starts_with("pidof")))
            .count()
    }

    pub fn set_running(&self, package: &str) {
        self.running_apps.lock().unwrap().push(package.to_string());
    }
}

impl DeviceControl for MockDevice {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        if self.fail_captures {
            return Err(AdbError::Timeout {
                duration: std::time::Duration::from_secs(10),
                description: "screencap -p".into(),
            });
        }
        let mut screens = self.screens.lock().unwrap();
        let bytes = screens.front().cloned().unwrap_or_default();
        if screens.len() > 1 {
            screens.pop_front();
        }
        Ok(bytes)
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        if x >= self.width || y >= self.height {
            return Err(AdbError::OutOfBounds { x, y });
        }
        self.events.lock().unwrap().push(InputEvent::Tap(x, y));
        Ok(())
    }

    async fn swipe(
        &self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration_ms: Option<u32>,
    ) -> AdbResult<()> {
        self.events.lock().unwrap().push(InputEvent::Swipe {
            from: (x1, y1),
            to: (x2, y2),
            duration_ms,
        });
        Ok(())
    }

    async fn shell(&self, cmd: &str) -> AdbResult<String> {
        self.events
            .lock()
            .unwrap()
            .push(InputEvent::Shell(cmd.to_string()));
        if let Some(rest) = cmd.strip_prefix("pidof ") {
            let package = rest.split_whitespace().next().unwrap_or_default();
            if self.running_apps.lock().unwrap().iter().any(|p| p == package) {
                return Ok("4242\n".into());
            }
            return Ok(String::new());
        }
        if let Some(rest) = cmd.strip_prefix("monkey -p ") {
            let package = rest.split_whitespace().next().unwrap_or_default();
            self.set_running(package);
        }
        Ok(String::new())
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}
