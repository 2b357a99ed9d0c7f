// Types shared by the dispatcher, the playbooks and the workers
use crate::template_matching::{DEFAULT_THRESHOLD, PointRule, RegionOfInterest, SortKey};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Screen the application is on, as far as the reference images tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScreenState {
    Locked,
    Booting,
    Dialog,
    Home,
    InActivity,
    Victory,
    Defeat,
    WorldMap,
    Unknown,
}

impl fmt::Display for ScreenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScreenState::Locked => "locked",
            ScreenState::Booting => "booting",
            ScreenState::Dialog => "dialog",
            ScreenState::Home => "home",
            ScreenState::InActivity => "in-activity",
            ScreenState::Victory => "victory",
            ScreenState::Defeat => "defeat",
            ScreenState::WorldMap => "world-map",
            ScreenState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// How `click_template` finds and presses its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickOptions {
    pub threshold: f32,
    pub roi: RegionOfInterest,
    pub rule: PointRule,
    pub sort: SortKey,
    pub index: usize,
    /// Added to the match point before tapping
    pub offset: (i32, i32),
    pub taps: u32,
    /// Press and hold instead of tapping
    pub long_press: bool,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            roi: RegionOfInterest::FULL_SCREEN,
            rule: PointRule::Center,
            sort: SortKey::Y,
            index: 0,
            offset: (0, 0),
            taps: 1,
            long_press: false,
        }
    }
}

impl ClickOptions {
    pub fn offset(mut self, dx: i32, dy: i32) -> Self {
        self.offset = (dx, dy);
        self
    }

    pub fn taps(mut self, taps: u32) -> Self {
        self.taps = taps;
        self
    }

    pub fn long_press(mut self) -> Self {
        self.long_press = true;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn roi(mut self, roi: RegionOfInterest) -> Self {
        self.roi = roi;
        self
    }

    pub fn index(mut self, sort: SortKey, index: usize) -> Self {
        self.sort = sort;
        self.index = index;
        self
    }
}

/// Bound for a polling loop: at most `max_attempts` checks, `interval`
/// apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollConfig {
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

/// Fixed delays and polling bounds used by the playbooks.
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    pub tap_interval: Duration,
    /// Pause after every input event
    pub settle: Duration,
    pub swipe: Duration,
    pub long_press: Duration,
    pub hold: Duration,
    pub app_start_wait: Duration,
    /// Waits between the steps that start an activity from home
    pub start_steps: [Duration; 3],
    pub iteration_pause: Duration,
    pub unlock_interval: Duration,
    /// While the activity runs on auto
    pub activity_poll: PollConfig,
    /// Overlays dismissed by tapping them
    pub overlay_poll: PollConfig,
    pub recovery_attempts: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            tap_interval: Duration::from_millis(100),
            settle: Duration::from_secs(1),
            swipe: Duration::from_millis(500),
            long_press: Duration::from_secs(5),
            hold: Duration::from_secs(10),
            app_start_wait: Duration::from_secs(60),
            start_steps: [
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(10),
            ],
            iteration_pause: Duration::from_secs(5),
            unlock_interval: Duration::from_secs(30),
            activity_poll: PollConfig::new(360, Duration::from_secs(5)),
            overlay_poll: PollConfig::new(20, Duration::from_secs(1)),
            recovery_attempts: 10,
        }
    }
}

impl Timings {
    /// No delays, same bounds; for tests.
    pub fn zero() -> Self {
        let defaults = Self::default();
        Self {
            tap_interval: Duration::ZERO,
            settle: Duration::ZERO,
            swipe: Duration::ZERO,
            long_press: Duration::ZERO,
            hold: Duration::ZERO,
            app_start_wait: Duration::ZERO,
            start_steps: [Duration::ZERO; 3],
            iteration_pause: Duration::ZERO,
            unlock_interval: Duration::ZERO,
            activity_poll: PollConfig::new(defaults.activity_poll.max_attempts, Duration::ZERO),
            overlay_poll: PollConfig::new(defaults.overlay_poll.max_attempts, Duration::ZERO),
            recovery_attempts: defaults.recovery_attempts,
        }
    }
}

/// Shared stop flag. Cloned into every worker; cancelling one clone
/// cancels them all.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel can not close here
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-worker progress, published over a watch channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub device: String,
    pub state: ScreenState,
    pub last_action: String,
    pub consecutive_failures: u32,
    pub iterations: u64,
    pub finished: bool,
}

impl SessionStatus {
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            state: ScreenState::Unknown,
            last_action: String::new(),
            consecutive_failures: 0,
            iterations: 0,
            finished: false,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} after {} iterations, last '{}', {} failures in a row",
            self.device, self.state, self.iterations, self.last_action, self.consecutive_failures
        )?;
        if self.finished {
            write!(f, " (finished)")?;
        }
        Ok(())
    }
}
