//! From a cold app to the home screen.

use super::{back_to_world, clear_empty_space, is_home};
use crate::adb::DeviceControl;
use crate::game_automation::dispatcher::ActionDispatcher;
use crate::game_automation::error::AutomationResult;
use crate::game_automation::templates::{Component, Template, TemplateId};
use crate::game_automation::types::ClickOptions;

const C: Component = Component::InitGame;

pub const IGNORE: Template = C.template(TemplateId::Ignore);
pub const CLICK_TO_START: Template = C.template(TemplateId::ClickToStart);
pub const CANCEL_OK: Template = C.template(TemplateId::CancelOk);
pub const OK: Template = C.template(TemplateId::Ok);
pub const START: Template = C.template(TemplateId::Start);
pub const BACK: Template = C.template(TemplateId::Back);
pub const LIGHT_WORLD: Template = C.template(TemplateId::LightWorld);
pub const WORLD: Template = C.template(TemplateId::World);

/// Asset rewards sit just above the start button.
const ASSETS_OFFSET: (i32, i32) = (0, -60);

/// Launch `package` if needed and work through the boot screens until the
/// home screen shows. Returns whether it ended on the home screen.
pub async fn run<D: DeviceControl>(
    dispatcher: &ActionDispatcher<D>,
    package: &str,
) -> AutomationResult<bool> {
    let poll = dispatcher.timings().overlay_poll;

    dispatcher.start_if_not_running(package).await?;
    dispatcher.dismiss_while_present(IGNORE, poll).await?;
    dispatcher.dismiss_while_present(CLICK_TO_START, poll).await?;
    confirm_download(dispatcher).await?;
    clear_empty_space(dispatcher, C).await?;

    if is_home(dispatcher, C).await? {
        collect_assets(dispatcher).await?;
    }
    back_to_world(dispatcher, C, &[BACK, LIGHT_WORLD, WORLD]).await?;
    is_home(dispatcher, C).await
}

/// The resource download prompt shows `cancel` and `ok`; accept it.
pub async fn confirm_download<D: DeviceControl>(
    dispatcher: &ActionDispatcher<D>,
) -> AutomationResult<bool> {
    if !dispatcher.check_screen(CANCEL_OK).await? {
        return Ok(false);
    }
    log::info!("📥 Accepting resource download");
    dispatcher.click_template(OK, ClickOptions::default()).await
}

async fn collect_assets<D: DeviceControl>(
    dispatcher: &ActionDispatcher<D>,
) -> AutomationResult<()> {
    let opts = ClickOptions::default().offset(ASSETS_OFFSET.0, ASSETS_OFFSET.1);
    if dispatcher.click_template(START, opts).await? {
        clear_empty_space(dispatcher, C).await?;
    }
    Ok(())
}
