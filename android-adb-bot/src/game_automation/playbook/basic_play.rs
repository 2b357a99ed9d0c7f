//! One round of the activity loop: start from home, wait out the auto
//! phase, take the outcome.

use super::{back_to_world, is_home};
use crate::adb::DeviceControl;
use crate::game_automation::dispatcher::ActionDispatcher;
use crate::game_automation::error::AutomationResult;
use crate::game_automation::templates::{Component, Template, TemplateId};
use crate::game_automation::types::{ClickOptions, ScreenState};

const C: Component = Component::BasicPlay;

pub const START: Template = C.template(TemplateId::Start);
pub const START_2: Template = C.template(TemplateId::Start2);
pub const AUTO: Template = C.template(TemplateId::Auto);
pub const VICTORY: Template = C.template(TemplateId::Victory);
pub const CONTINUE: Template = C.template(TemplateId::Continue);
pub const DEFEAT: Template = C.template(TemplateId::Defeat);
pub const PLAY_AGAIN: Template = C.template(TemplateId::PlayAgain);
pub const BACK: Template = C.template(TemplateId::Back);
pub const WORLD: Template = C.template(TemplateId::World);

/// Play one round. Returns the screen the round ended on.
pub async fn play<D: DeviceControl>(
    dispatcher: &ActionDispatcher<D>,
) -> AutomationResult<ScreenState> {
    let state = if is_home(dispatcher, C).await? {
        start_from_home(dispatcher).await?;
        finish_activity(dispatcher).await?
    } else if dispatcher
        .click_template(START_2, ClickOptions::default())
        .await?
    {
        log::info!("▶️ Resuming at the activity stage");
        finish_activity(dispatcher).await?
    } else {
        log::info!("🧭 Not home, heading back to the world map");
        back_to_world(dispatcher, C, &[BACK, WORLD]).await?;
        ScreenState::Home
    };
    dispatcher.sleep(dispatcher.timings().iteration_pause).await?;
    Ok(state)
}

async fn start_from_home<D: DeviceControl>(
    dispatcher: &ActionDispatcher<D>,
) -> AutomationResult<()> {
    let [short, long, loading] = dispatcher.timings().start_steps;
    log::info!("🏁 Starting activity from home");
    dispatcher.click_template(START, ClickOptions::default()).await?;
    dispatcher.sleep(short).await?;
    dispatcher.click_template(START, ClickOptions::default()).await?;
    dispatcher.sleep(long).await?;
    dispatcher.click_template(START_2, ClickOptions::default()).await?;
    dispatcher.sleep(loading).await
}

/// Wait while the activity plays itself, then acknowledge the result.
pub async fn finish_activity<D: DeviceControl>(
    dispatcher: &ActionDispatcher<D>,
) -> AutomationResult<ScreenState> {
    dispatcher
        .wait_while_present(AUTO, dispatcher.timings().activity_poll)
        .await?;

    if dispatcher
        .click_template(VICTORY, ClickOptions::default())
        .await?
    {
        log::info!("🏆 Victory");
        dispatcher
            .click_template(CONTINUE, ClickOptions::default())
            .await?;
        Ok(ScreenState::Victory)
    } else if dispatcher
        .click_template(DEFEAT, ClickOptions::default())
        .await?
    {
        log::info!("💀 Defeat");
        dispatcher
            .click_template(PLAY_AGAIN, ClickOptions::default())
            .await?;
        Ok(ScreenState::Defeat)
    } else {
        Ok(ScreenState::Unknown)
    }
}
