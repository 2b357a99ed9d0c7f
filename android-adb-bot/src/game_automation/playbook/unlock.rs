//! Lock screen handling.

use crate::adb::DeviceControl;
use crate::game_automation::dispatcher::ActionDispatcher;
use crate::game_automation::error::AutomationResult;
use crate::game_automation::templates::{Component, Template, TemplateId};
use crate::template_matching::{DEFAULT_THRESHOLD, MatchPoint};
use image::GrayImage;

pub const LOCK: Template = Component::UnlockPhone.template(TemplateId::Lock);

/// Brightest pixel of a screen that is switched off.
const DARK_SCREEN_MAX: u8 = 16;

/// Unlock the phone when the lock screen is showing: swipe from the middle
/// of the screen to the right edge, 100 px above the middle, then hold at
/// the end point. Returns whether the lock screen was found.
pub async fn unlock<D: DeviceControl>(dispatcher: &ActionDispatcher<D>) -> AutomationResult<bool> {
    let mut screen = dispatcher.screen().await?;
    if is_dark(&screen) {
        log::info!("💡 Screen is off, waking it");
        dispatcher.wake_screen().await?;
        screen = dispatcher.screen().await?;
    }
    if !dispatcher.check_screen_on(&screen, LOCK, DEFAULT_THRESHOLD)? {
        return Ok(false);
    }

    let (from, to) = unlock_gesture(screen.dimensions());
    log::info!("🔓 Lock screen detected, unlocking");
    dispatcher
        .swipe(from, to, dispatcher.timings().swipe)
        .await?;
    dispatcher.long_press(to).await?;
    Ok(true)
}

/// Start and end point of the unlock swipe for a `width`×`height` screen.
pub fn unlock_gesture((width, height): (u32, u32)) -> (MatchPoint, MatchPoint) {
    let from = MatchPoint::new(width / 2, height / 2);
    // The right edge itself is one past the last column
    let to = MatchPoint::new(
        width.saturating_sub(1),
        (height / 2).saturating_sub(100),
    );
    (from, to)
}

fn is_dark(screen: &GrayImage) -> bool {
    screen.pixels().all(|p| p[0] <= DARK_SCREEN_MAX)
}
