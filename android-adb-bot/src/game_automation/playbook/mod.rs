/// Playbooks: hard-coded screen sequences built on the dispatcher.
///
/// - `unlock`: gets the phone past its lock screen
/// - `init_game`: launches the app and clears the boot overlays until home
/// - `basic_play`: starts an activity from home and collects the outcome
pub mod basic_play;
pub mod init_game;
pub mod unlock;

use super::dispatcher::ActionDispatcher;
use super::error::{AutomationError, AutomationResult};
use super::templates::{Component, Template, TemplateId};
use crate::adb::DeviceControl;
use crate::template_matching::DEFAULT_THRESHOLD;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybookKind {
    BasicPlay,
    InitGame,
    UnlockPhone,
}

impl PlaybookKind {
    /// Template components the playbook needs loaded.
    pub fn components(&self) -> &'static [Component] {
        match self {
            PlaybookKind::BasicPlay => &[Component::BasicPlay],
            PlaybookKind::InitGame => &[Component::InitGame],
            PlaybookKind::UnlockPhone => &[Component::UnlockPhone],
        }
    }

    /// Whether the playbook launches the app itself and so needs a package.
    pub fn needs_package(&self) -> bool {
        matches!(self, PlaybookKind::InitGame)
    }
}

impl FromStr for PlaybookKind {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic_play" => Ok(PlaybookKind::BasicPlay),
            "init_game" => Ok(PlaybookKind::InitGame),
            "unlock_phone" => Ok(PlaybookKind::UnlockPhone),
            other => Err(AutomationError::UnknownPlaybook(other.to_string())),
        }
    }
}

impl fmt::Display for PlaybookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybookKind::BasicPlay => write!(f, "basic_play"),
            PlaybookKind::InitGame => write!(f, "init_game"),
            PlaybookKind::UnlockPhone => write!(f, "unlock_phone"),
        }
    }
}

/// Home screen: `inventory` and `start` both visible on one capture.
pub async fn is_home<D: DeviceControl>(
    dispatcher: &ActionDispatcher<D>,
    component: Component,
) -> AutomationResult<bool> {
    let screen = dispatcher.screen().await?;
    let inventory = component.template(TemplateId::Inventory);
    let start = component.template(TemplateId::Start);
    let home = dispatcher.check_screen_on(&screen, inventory, DEFAULT_THRESHOLD)?
        && dispatcher.check_screen_on(&screen, start, DEFAULT_THRESHOLD)?;
    log::debug!("🏠 is_home: {home}");
    Ok(home)
}

/// Tap `empty_space` overlays away until none is left.
pub async fn clear_empty_space<D: DeviceControl>(
    dispatcher: &ActionDispatcher<D>,
    component: Component,
) -> AutomationResult<u32> {
    dispatcher
        .dismiss_while_present(
            component.template(TemplateId::EmptySpace),
            dispatcher.timings().overlay_poll,
        )
        .await
}

/// Navigate back to the home screen by tapping through `steps` (each only
/// when visible) and clearing overlays, up to the recovery bound.
pub async fn back_to_world<D: DeviceControl>(
    dispatcher: &ActionDispatcher<D>,
    component: Component,
    steps: &[Template],
) -> AutomationResult<()> {
    let attempts = dispatcher.timings().recovery_attempts;
    for attempt in 0..attempts {
        if is_home(dispatcher, component).await? {
            if attempt > 0 {
                log::info!("🏠 Back home after {attempt} recovery rounds");
            }
            return Ok(());
        }
        for step in steps {
            dispatcher.click_template(*step, Default::default()).await?;
        }
        clear_empty_space(dispatcher, component).await?;
    }
    Err(AutomationError::Timeout {
        what: "the home screen".into(),
        attempts,
    })
}

#[cfg(test)]
mod tests;
