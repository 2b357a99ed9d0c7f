//! Turns matches into input events, and polls the screen until a template
//! shows up or goes away.

use super::error::{AutomationError, AutomationResult};
use super::templates::{Template, TemplateRegistry};
use super::types::{CancelToken, ClickOptions, PollConfig, Timings};
use crate::adb::{DeviceControl, keycode};
use crate::template_matching::{
    DEFAULT_THRESHOLD, MatchCandidate, MatchPoint, RegionOfInterest, TemplateMatcher,
    capture_gray, select,
};
use image::GrayImage;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Where an on-screen joystick sits and whether it is already drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joystick {
    pub center: MatchPoint,
    /// A visible joystick is moved by pressing on the target point only
    pub shown: bool,
}

/// Point `radius` pixels from `center` at `degrees` (0° = right, clockwise
/// on screen since y grows downwards).
pub fn point_on_circle(center: MatchPoint, radius: f64, degrees: f64) -> MatchPoint {
    let radians = degrees.to_radians();
    let x = center.x as f64 + radius * radians.cos();
    let y = center.y as f64 + radius * radians.sin();
    MatchPoint::new(x.round().max(0.0) as u32, y.round().max(0.0) as u32)
}

pub struct ActionDispatcher<D: DeviceControl> {
    device: D,
    templates: Arc<TemplateRegistry>,
    matcher: TemplateMatcher,
    timings: Timings,
    cancel: CancelToken,
    last_action: Mutex<String>,
}

impl<D: DeviceControl> ActionDispatcher<D> {
    pub fn new(
        device: D,
        templates: Arc<TemplateRegistry>,
        timings: Timings,
        cancel: CancelToken,
    ) -> Self {
        Self {
            device,
            templates,
            matcher: TemplateMatcher::new(),
            timings,
            cancel,
            last_action: Mutex::new(String::new()),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Description of the most recent input event.
    pub fn last_action(&self) -> String {
        self.last_action
            .lock()
            .map(|action| action.clone())
            .unwrap_or_default()
    }

    fn record(&self, action: String) {
        log::debug!("👆 {}: {}", self.device.device_name(), action);
        if let Ok(mut last) = self.last_action.lock() {
            *last = action;
        }
    }

    fn ensure_running(&self) -> AutomationResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AutomationError::Cancelled);
        }
        Ok(())
    }

    /// Wait `duration`, returning early with `Cancelled` when the token
    /// fires.
    pub async fn sleep(&self, duration: Duration) -> AutomationResult<()> {
        self.ensure_running()?;
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => Err(AutomationError::Cancelled),
        }
    }

    /// Fresh grayscale screenshot.
    pub async fn screen(&self) -> AutomationResult<GrayImage> {
        self.ensure_running()?;
        capture_gray(&self.device).await
    }

    /// Matches of `template` on an already captured screen.
    pub fn find_on(
        &self,
        screen: &GrayImage,
        template: Template,
        roi: RegionOfInterest,
        threshold: f32,
    ) -> AutomationResult<Vec<MatchCandidate>> {
        let reference = self.templates.get(template)?;
        let matches = self.matcher.find_matches(reference, screen, roi, threshold);
        log::debug!("🔍 {} -> {} matches", template, matches.len());
        Ok(matches)
    }

    /// Point `opts` selects for `template` on `screen`, if any.
    pub fn locate_on(
        &self,
        screen: &GrayImage,
        template: Template,
        opts: &ClickOptions,
    ) -> AutomationResult<Option<MatchPoint>> {
        let matches = self.find_on(screen, template, opts.roi, opts.threshold)?;
        Ok(select(&matches, opts.rule, opts.sort, opts.index))
    }

    pub async fn check_screen(&self, template: Template) -> AutomationResult<bool> {
        self.check_screen_with(template, DEFAULT_THRESHOLD).await
    }

    pub async fn check_screen_with(
        &self,
        template: Template,
        threshold: f32,
    ) -> AutomationResult<bool> {
        let screen = self.screen().await?;
        self.check_screen_on(&screen, template, threshold)
    }

    /// True iff `template` matches somewhere on a screen captured earlier.
    pub fn check_screen_on(
        &self,
        screen: &GrayImage,
        template: Template,
        threshold: f32,
    ) -> AutomationResult<bool> {
        let found = !self
            .find_on(screen, template, RegionOfInterest::FULL_SCREEN, threshold)?
            .is_empty();
        Ok(found)
    }

    pub async fn click_point(&self, point: MatchPoint) -> AutomationResult<()> {
        self.ensure_running()?;
        self.device.tap(point.x, point.y).await?;
        self.record(format!("tap ({}, {})", point.x, point.y));
        self.sleep(self.timings.settle).await
    }

    /// Find `template` and press it as `opts` describes. `Ok(false)` when it
    /// is not on screen, in which case no input is sent.
    pub async fn click_template(
        &self,
        template: Template,
        opts: ClickOptions,
    ) -> AutomationResult<bool> {
        let screen = self.screen().await?;
        self.click_on(&screen, template, opts).await
    }

    async fn click_on(
        &self,
        screen: &GrayImage,
        template: Template,
        opts: ClickOptions,
    ) -> AutomationResult<bool> {
        let Some(point) = self.locate_on(screen, template, &opts)? else {
            log::debug!("👀 {} not on screen", template);
            return Ok(false);
        };
        let target = point.offset(opts.offset, screen.dimensions());

        if opts.long_press {
            self.press(target, self.timings.long_press).await?;
            self.record(format!("long press {template} at ({}, {})", target.x, target.y));
        } else {
            for _ in 0..opts.taps {
                self.device.tap(target.x, target.y).await?;
                self.sleep(self.timings.tap_interval).await?;
            }
            self.record(format!("tap {template} at ({}, {})", target.x, target.y));
        }
        self.sleep(self.timings.settle).await?;
        Ok(true)
    }

    /// Press and hold the first match of `template` for the hold duration.
    /// Logs and does nothing when it is not on screen.
    pub async fn hold_template(&self, template: Template) -> AutomationResult<bool> {
        let screen = self.screen().await?;
        let Some(point) = self.locate_on(&screen, template, &ClickOptions::default())? else {
            log::warn!("⚠️ Cannot find {} to hold", template);
            return Ok(false);
        };
        // A 1 px move keeps the gesture from being read as a long click
        self.device
            .swipe(
                point.x,
                point.y,
                point.x + 1,
                point.y + 1,
                Some(duration_ms(self.timings.hold)),
            )
            .await?;
        self.record(format!("hold {template} at ({}, {})", point.x, point.y));
        self.sleep(self.timings.settle).await?;
        Ok(true)
    }

    /// Poll until `template` is gone. Returns the number of checks that
    /// still saw it.
    pub async fn wait_while_present(
        &self,
        template: Template,
        poll: PollConfig,
    ) -> AutomationResult<u32> {
        self.poll_until(template, poll, false).await
    }

    /// Poll until `template` shows up.
    pub async fn wait_while_absent(
        &self,
        template: Template,
        poll: PollConfig,
    ) -> AutomationResult<u32> {
        self.poll_until(template, poll, true).await
    }

    async fn poll_until(
        &self,
        template: Template,
        poll: PollConfig,
        want_present: bool,
    ) -> AutomationResult<u32> {
        for attempt in 0..poll.max_attempts {
            if self.check_screen(template).await? == want_present {
                return Ok(attempt);
            }
            self.sleep(poll.interval).await?;
        }
        let what = if want_present {
            format!("{template} to appear")
        } else {
            format!("{template} to disappear")
        };
        Err(AutomationError::Timeout {
            what,
            attempts: poll.max_attempts,
        })
    }

    /// Tap `template` for as long as it keeps showing up. Returns how many
    /// taps it took.
    pub async fn dismiss_while_present(
        &self,
        template: Template,
        poll: PollConfig,
    ) -> AutomationResult<u32> {
        let mut clicks = 0;
        for _ in 0..poll.max_attempts {
            let screen = self.screen().await?;
            if !self.click_on(&screen, template, ClickOptions::default()).await? {
                return Ok(clicks);
            }
            clicks += 1;
            self.sleep(poll.interval).await?;
        }
        Err(AutomationError::Timeout {
            what: format!("{template} to be dismissed"),
            attempts: poll.max_attempts,
        })
    }

    pub async fn swipe(
        &self,
        from: MatchPoint,
        to: MatchPoint,
        duration: Duration,
    ) -> AutomationResult<()> {
        self.ensure_running()?;
        self.device
            .swipe(from.x, from.y, to.x, to.y, Some(duration_ms(duration)))
            .await?;
        self.record(format!(
            "swipe ({}, {}) -> ({}, {})",
            from.x, from.y, to.x, to.y
        ));
        Ok(())
    }

    /// Zero-distance swipe held for the long press duration.
    pub async fn long_press(&self, point: MatchPoint) -> AutomationResult<()> {
        self.ensure_running()?;
        self.press(point, self.timings.long_press).await?;
        self.record(format!("long press ({}, {})", point.x, point.y));
        Ok(())
    }

    async fn press(&self, point: MatchPoint, duration: Duration) -> AutomationResult<()> {
        self.device
            .swipe(point.x, point.y, point.x, point.y, Some(duration_ms(duration)))
            .await?;
        Ok(())
    }

    pub async fn back(&self) -> AutomationResult<()> {
        self.key(keycode::BACK, "back").await
    }

    pub async fn wake_screen(&self) -> AutomationResult<()> {
        self.key(keycode::WAKEUP, "wake").await
    }

    async fn key(&self, code: u32, name: &str) -> AutomationResult<()> {
        self.ensure_running()?;
        self.device.key_event(code).await?;
        self.record(format!("key {name}"));
        self.sleep(self.timings.settle).await
    }

    pub async fn enter_text(&self, text: &str) -> AutomationResult<()> {
        self.ensure_running()?;
        self.device.input_text(text).await?;
        self.record(format!("text '{text}'"));
        Ok(())
    }

    /// Push the joystick `radius` pixels towards `degrees`.
    pub async fn joystick(
        &self,
        joystick: Joystick,
        radius: f64,
        degrees: f64,
        duration: Duration,
    ) -> AutomationResult<()> {
        let target = point_on_circle(joystick.center, radius, degrees);
        let from = if joystick.shown { target } else { joystick.center };
        self.swipe(from, target, duration).await
    }

    pub async fn is_app_running(&self, package: &str) -> AutomationResult<bool> {
        Ok(self.device.is_app_running(package).await?)
    }

    /// Launch `package` unless it already runs, then give it time to load.
    /// Returns whether it had to be started.
    pub async fn start_if_not_running(&self, package: &str) -> AutomationResult<bool> {
        self.ensure_running()?;
        if self.device.is_app_running(package).await? {
            return Ok(false);
        }
        log::info!("🚀 {}: starting {}", self.device.device_name(), package);
        self.device.start_app(package).await?;
        self.record(format!("start {package}"));
        self.sleep(self.timings.app_start_wait).await?;
        Ok(true)
    }

    pub async fn stop_app(&self, package: &str) -> AutomationResult<()> {
        self.device.stop_app(package).await?;
        self.record(format!("stop {package}"));
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u32 {
    duration.as_millis().min(u32::MAX as u128) as u32
}
