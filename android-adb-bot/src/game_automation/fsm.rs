// Screen state machine: classifies the current screen and runs one
// playbook iteration per call
use super::dispatcher::ActionDispatcher;
use super::error::{AutomationError, AutomationResult};
use super::playbook::{PlaybookKind, basic_play, init_game, unlock};
use super::templates::{Component, Template, TemplateId};
use super::types::{ScreenState, SessionStatus};
use crate::adb::DeviceControl;
use crate::template_matching::DEFAULT_THRESHOLD;
use image::GrayImage;
use tokio::sync::watch;

/// Templates that identify each state, checked in order; the first state
/// whose templates all match wins.
const STATE_MARKERS: &[(ScreenState, &[TemplateId])] = &[
    (ScreenState::Locked, &[TemplateId::Lock]),
    (ScreenState::Victory, &[TemplateId::Victory]),
    (ScreenState::Defeat, &[TemplateId::Defeat]),
    (ScreenState::InActivity, &[TemplateId::Auto]),
    (ScreenState::Home, &[TemplateId::Inventory, TemplateId::Start]),
    (ScreenState::InActivity, &[TemplateId::Start2]),
    (ScreenState::Dialog, &[TemplateId::CancelOk]),
    (ScreenState::Dialog, &[TemplateId::EmptySpace]),
    (ScreenState::Booting, &[TemplateId::Ignore]),
    (ScreenState::Booting, &[TemplateId::ClickToStart]),
    (ScreenState::WorldMap, &[TemplateId::LightWorld]),
    (ScreenState::WorldMap, &[TemplateId::World]),
];

pub struct ScreenStateEngine<D: DeviceControl> {
    dispatcher: ActionDispatcher<D>,
    playbook: PlaybookKind,
    package: String,
    status: watch::Sender<SessionStatus>,
}

impl<D: DeviceControl> ScreenStateEngine<D> {
    pub fn new(
        dispatcher: ActionDispatcher<D>,
        playbook: PlaybookKind,
        package: impl Into<String>,
        status: watch::Sender<SessionStatus>,
    ) -> Self {
        Self {
            dispatcher,
            playbook,
            package: package.into(),
            status,
        }
    }

    pub fn dispatcher(&self) -> &ActionDispatcher<D> {
        &self.dispatcher
    }

    pub fn into_dispatcher(self) -> ActionDispatcher<D> {
        self.dispatcher
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Classify the current screen from a single capture.
    pub async fn detect_state(&self) -> AutomationResult<ScreenState> {
        let screen = self.dispatcher.screen().await?;
        self.classify(&screen)
    }

    /// First marker set fully visible on `screen`. Templates that are not
    /// loaded never match.
    pub fn classify(&self, screen: &GrayImage) -> AutomationResult<ScreenState> {
        for (state, ids) in STATE_MARKERS {
            let mut all = true;
            for id in ids.iter() {
                let Some(template) = self.loaded(*id) else {
                    all = false;
                    break;
                };
                if !self
                    .dispatcher
                    .check_screen_on(screen, template, DEFAULT_THRESHOLD)?
                {
                    all = false;
                    break;
                }
            }
            if all {
                return Ok(*state);
            }
        }
        Ok(ScreenState::Unknown)
    }

    /// The loaded template for `id`, preferring the running playbook's own
    /// component.
    fn loaded(&self, id: TemplateId) -> Option<Template> {
        let own = self.playbook.components().iter().copied();
        let others = [
            Component::UnlockPhone,
            Component::BasicPlay,
            Component::InitGame,
        ];
        own.chain(others)
            .map(|component| component.template(id))
            .find(|template| self.dispatcher.templates().contains(*template))
    }

    /// Run one iteration of the playbook and publish the outcome.
    pub async fn run(&mut self) -> AutomationResult<ScreenState> {
        if self.dispatcher.cancel_token().is_cancelled() {
            return Err(AutomationError::Cancelled);
        }
        let result = self.iterate().await;
        self.publish(&result);
        result
    }

    async fn iterate(&self) -> AutomationResult<ScreenState> {
        match self.playbook {
            PlaybookKind::UnlockPhone => {
                let state = if unlock::unlock(&self.dispatcher).await? {
                    ScreenState::Booting
                } else {
                    self.detect_state().await?
                };
                self.dispatcher
                    .sleep(self.dispatcher.timings().unlock_interval)
                    .await?;
                Ok(state)
            }
            PlaybookKind::InitGame => {
                self.unlock_if_configured().await?;
                if init_game::run(&self.dispatcher, &self.package).await? {
                    Ok(ScreenState::Home)
                } else {
                    self.detect_state().await
                }
            }
            PlaybookKind::BasicPlay => {
                self.unlock_if_configured().await?;
                basic_play::play(&self.dispatcher).await
            }
        }
    }

    /// Other playbooks also check the lock screen when its template is
    /// loaded.
    async fn unlock_if_configured(&self) -> AutomationResult<()> {
        if self.dispatcher.templates().contains(unlock::LOCK) {
            unlock::unlock(&self.dispatcher).await?;
        }
        Ok(())
    }

    /// Mark the session as over; no more iterations follow.
    pub fn finish(&self) {
        self.status.send_modify(|status| status.finished = true);
    }

    fn publish(&self, result: &AutomationResult<ScreenState>) {
        let last_action = self.dispatcher.last_action();
        let device = self.dispatcher.device().device_name().to_string();
        self.status.send_modify(|status| {
            status.iterations += 1;
            status.last_action = last_action;
            match result {
                Ok(state) => {
                    if status.state != *state {
                        log::info!("🎮 {}: {} -> {}", device, status.state, state);
                    }
                    status.state = *state;
                    status.consecutive_failures = 0;
                }
                Err(AutomationError::Cancelled) => {}
                Err(e) => {
                    status.consecutive_failures += 1;
                    log::warn!(
                        "⚠️ {}: iteration failed ({} in a row): {}",
                        device,
                        status.consecutive_failures,
                        e
                    );
                }
            }
        });
    }
}
