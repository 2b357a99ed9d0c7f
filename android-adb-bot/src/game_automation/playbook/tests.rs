//! Playbook runs against scripted screen sequences. Each capture takes the
//! next queued screen; the last one stays.

use super::basic_play::{
    self, AUTO, CONTINUE, DEFEAT, PLAY_AGAIN, START, START_2, VICTORY,
};
use super::init_game::{self, CANCEL_OK, CLICK_TO_START, IGNORE, OK};
use super::unlock::{self, LOCK};
use super::*;
use crate::adb::mock::{InputEvent, MockDevice};
use crate::game_automation::{ScreenState, Timings};
use crate::test_support::{center_of, dispatcher_for, screen_with, solid};

fn inventory(component: Component) -> Template {
    component.template(TemplateId::Inventory)
}

fn basic_home() -> image::GrayImage {
    screen_with(&[(inventory(Component::BasicPlay), 10, 10), (START, 100, 80)])
}

#[test]
fn playbook_names_parse() {
    assert_eq!(
        "basic_play".parse::<PlaybookKind>().unwrap(),
        PlaybookKind::BasicPlay
    );
    assert_eq!(
        " Init_Game ".parse::<PlaybookKind>().unwrap(),
        PlaybookKind::InitGame
    );
    assert_eq!(PlaybookKind::UnlockPhone.to_string(), "unlock_phone");
    assert!(matches!(
        "farm".parse::<PlaybookKind>(),
        Err(AutomationError::UnknownPlaybook(_))
    ));
}

#[tokio::test]
async fn home_needs_inventory_and_start() {
    let both = dispatcher_for(
        MockDevice::new(&basic_home()),
        &[Component::BasicPlay],
        Timings::zero(),
    );
    assert!(is_home(&both, Component::BasicPlay).await.unwrap());

    let only_inventory = dispatcher_for(
        MockDevice::new(&screen_with(&[(inventory(Component::BasicPlay), 10, 10)])),
        &[Component::BasicPlay],
        Timings::zero(),
    );
    assert!(!is_home(&only_inventory, Component::BasicPlay).await.unwrap());
}

#[tokio::test]
async fn unlock_swipes_then_holds() {
    let device = MockDevice::new(&screen_with(&[(LOCK, 70, 50)]));
    let dispatcher = dispatcher_for(device, &[Component::UnlockPhone], Timings::zero());
    assert!(unlock::unlock(&dispatcher).await.unwrap());

    let (from, to) = unlock::unlock_gesture((160, 120));
    assert_eq!(
        dispatcher.device().events(),
        vec![
            InputEvent::Swipe {
                from: (from.x, from.y),
                to: (to.x, to.y),
                duration_ms: Some(0),
            },
            InputEvent::Swipe {
                from: (to.x, to.y),
                to: (to.x, to.y),
                duration_ms: Some(0),
            },
        ]
    );
}

#[tokio::test]
async fn unlock_leaves_unlocked_phone_alone() {
    let device = MockDevice::new(&screen_with(&[]));
    let dispatcher = dispatcher_for(device, &[Component::UnlockPhone], Timings::zero());
    assert!(!unlock::unlock(&dispatcher).await.unwrap());
    assert_eq!(dispatcher.device().input_count(), 0);
}

#[tokio::test]
async fn unlock_wakes_a_dark_screen_first() {
    let device = MockDevice::with_screens(&[solid(160, 120, 0), screen_with(&[(LOCK, 70, 50)])]);
    let dispatcher = dispatcher_for(device, &[Component::UnlockPhone], Timings::zero());
    assert!(unlock::unlock(&dispatcher).await.unwrap());
    let events = dispatcher.device().events();
    assert_eq!(events[0], InputEvent::Shell("input keyevent 224".into()));
    assert_eq!(events.len(), 3);
}

#[tokio::test]
async fn basic_play_from_home_to_victory() {
    let stage = screen_with(&[(START_2, 60, 50)]);
    let auto = screen_with(&[(AUTO, 130, 10)]);
    let result = screen_with(&[(VICTORY, 40, 20), (CONTINUE, 40, 80)]);
    let device = MockDevice::with_screens(&[
        basic_home(),
        basic_home(),
        basic_home(),
        stage,
        auto,
        result,
    ]);
    let dispatcher = dispatcher_for(device, &[Component::BasicPlay], Timings::zero());

    let state = basic_play::play(&dispatcher).await.unwrap();
    assert_eq!(state, ScreenState::Victory);
    assert_eq!(
        dispatcher.device().taps(),
        vec![
            center_of(100, 80),
            center_of(100, 80),
            center_of(60, 50),
            center_of(40, 20),
            center_of(40, 80),
        ]
    );
}

#[tokio::test]
async fn basic_play_resumes_at_stage_and_takes_defeat() {
    let stage = screen_with(&[(START_2, 60, 50)]);
    let auto = screen_with(&[(AUTO, 130, 10)]);
    let result = screen_with(&[(DEFEAT, 40, 20), (PLAY_AGAIN, 40, 80)]);
    let device = MockDevice::with_screens(&[stage.clone(), stage, auto, result]);
    let dispatcher = dispatcher_for(device, &[Component::BasicPlay], Timings::zero());

    let state = basic_play::play(&dispatcher).await.unwrap();
    assert_eq!(state, ScreenState::Defeat);
    assert_eq!(
        dispatcher.device().taps(),
        vec![center_of(60, 50), center_of(40, 20), center_of(40, 80)]
    );
}

#[tokio::test]
async fn basic_play_recovers_to_home() {
    let world = screen_with(&[(basic_play::BACK, 5, 100), (basic_play::WORLD, 130, 100)]);
    let mut screens = vec![world; 6];
    screens.push(basic_home());
    let dispatcher = dispatcher_for(
        MockDevice::with_screens(&screens),
        &[Component::BasicPlay],
        Timings::zero(),
    );

    let state = basic_play::play(&dispatcher).await.unwrap();
    assert_eq!(state, ScreenState::Home);
    assert_eq!(
        dispatcher.device().taps(),
        vec![center_of(5, 100), center_of(130, 100)]
    );
}

#[tokio::test]
async fn recovery_is_bounded() {
    let mut timings = Timings::zero();
    timings.recovery_attempts = 2;
    let dispatcher = dispatcher_for(
        MockDevice::new(&screen_with(&[])),
        &[Component::BasicPlay],
        timings,
    );
    let err = back_to_world(
        &dispatcher,
        Component::BasicPlay,
        &[basic_play::BACK, basic_play::WORLD],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AutomationError::Timeout { attempts: 2, .. }));
    assert_eq!(dispatcher.device().input_count(), 0);
}

#[tokio::test]
async fn init_game_boots_to_home() {
    let c = Component::InitGame;
    let empty_space = c.template(TemplateId::EmptySpace);
    let start = c.template(TemplateId::Start);
    let ignore = screen_with(&[(IGNORE, 70, 50)]);
    let click_to_start = screen_with(&[(CLICK_TO_START, 70, 90)]);
    let dialog = screen_with(&[(CANCEL_OK, 20, 40), (OK, 100, 40)]);
    let overlay = screen_with(&[(empty_space, 70, 100)]);
    let home = screen_with(&[(inventory(c), 10, 10), (start, 100, 80)]);
    let device = MockDevice::with_screens(&[
        ignore,
        click_to_start.clone(),
        click_to_start,
        dialog.clone(),
        dialog.clone(),
        dialog,
        overlay,
        home,
    ]);
    let dispatcher = dispatcher_for(device, &[Component::InitGame], Timings::zero());

    assert!(init_game::run(&dispatcher, "com.example.game").await.unwrap());

    let (start_x, start_y) = center_of(100, 80);
    assert_eq!(
        dispatcher.device().taps(),
        vec![
            center_of(70, 50),
            center_of(70, 90),
            center_of(100, 40),
            center_of(70, 100),
            (start_x, start_y - 60),
        ]
    );
    let launched = dispatcher.device().events().iter().any(
        |e| matches!(e, InputEvent::Shell(cmd) if cmd.starts_with("monkey -p com.example.game")),
    );
    assert!(launched);
}

#[tokio::test]
async fn download_prompt_is_only_confirmed_when_shown() {
    let dispatcher = dispatcher_for(
        MockDevice::new(&screen_with(&[(OK, 100, 40)])),
        &[Component::InitGame],
        Timings::zero(),
    );
    assert!(!init_game::confirm_download(&dispatcher).await.unwrap());
    assert_eq!(dispatcher.device().input_count(), 0);
}
