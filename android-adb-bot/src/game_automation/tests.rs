// Dispatcher and engine behaviour against a scripted mock device
use super::playbook::basic_play::{AUTO, CONTINUE, START, START_2, VICTORY};
use super::playbook::unlock::LOCK;
use super::*;
use crate::adb::AdbError;
use crate::adb::mock::{InputEvent, MockDevice};
use crate::template_matching::MatchPoint;
use crate::test_support::{center_of, dispatcher_for, screen_with, solid};
use std::time::Duration;
use tokio::sync::watch;

fn basic(device: MockDevice) -> ActionDispatcher<MockDevice> {
    dispatcher_for(device, &[Component::BasicPlay], Timings::zero())
}

#[tokio::test]
async fn check_screen_finds_pasted_copy() {
    let device = MockDevice::new(&screen_with(&[(START, 70, 40)]));
    let dispatcher = basic(device);
    assert!(dispatcher.check_screen(START).await.unwrap());
    assert!(!dispatcher.check_screen(AUTO).await.unwrap());
}

#[tokio::test]
async fn check_screen_is_false_on_solid_screen() {
    let dispatcher = basic(MockDevice::new(&solid(160, 120, 90)));
    assert!(!dispatcher.check_screen(START).await.unwrap());
}

#[tokio::test]
async fn click_on_missing_template_sends_nothing() {
    let device = MockDevice::new(&screen_with(&[(START, 70, 40)]));
    let dispatcher = basic(device);
    let clicked = dispatcher
        .click_template(VICTORY, ClickOptions::default())
        .await
        .unwrap();
    assert!(!clicked);
    assert_eq!(dispatcher.device().input_count(), 0);
}

#[tokio::test]
async fn click_taps_the_match_center() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[(START, 40, 30)])));
    let clicked = dispatcher
        .click_template(START, ClickOptions::default())
        .await
        .unwrap();
    assert!(clicked);
    assert_eq!(dispatcher.device().taps(), vec![center_of(40, 30)]);
    assert!(dispatcher.last_action().contains("basic_play/start"));
}

#[tokio::test]
async fn click_point_taps_without_matching() {
    let dispatcher = basic(MockDevice::new(&solid(160, 120, 90)));
    dispatcher.click_point(MatchPoint::new(12, 34)).await.unwrap();
    assert_eq!(dispatcher.device().taps(), vec![(12, 34)]);
    assert_eq!(dispatcher.last_action(), "tap (12, 34)");
}

#[tokio::test]
async fn click_offset_saturates_at_the_top_edge() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[(START, 40, 30)])));
    dispatcher
        .click_template(START, ClickOptions::default().offset(0, -60))
        .await
        .unwrap();
    let (x, _) = center_of(40, 30);
    assert_eq!(dispatcher.device().taps(), vec![(x, 0)]);
}

#[tokio::test]
async fn click_offset_stops_at_the_last_pixel() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[(START, 40, 30)])));
    dispatcher
        .click_template(START, ClickOptions::default().offset(500, 500))
        .await
        .unwrap();
    assert_eq!(dispatcher.device().taps(), vec![(159, 119)]);
}

#[tokio::test]
async fn click_repeats_taps() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[(START, 40, 30)])));
    dispatcher
        .click_template(START, ClickOptions::default().taps(3))
        .await
        .unwrap();
    assert_eq!(dispatcher.device().taps().len(), 3);
}

#[tokio::test]
async fn click_picks_by_index_in_y_order() {
    let screen = screen_with(&[(START, 40, 90), (START, 40, 10), (START, 40, 50)]);
    let dispatcher = basic(MockDevice::new(&screen));
    dispatcher
        .click_template(
            START,
            ClickOptions::default().index(crate::template_matching::SortKey::Y, 1),
        )
        .await
        .unwrap();
    assert_eq!(dispatcher.device().taps(), vec![center_of(40, 50)]);
}

#[tokio::test]
async fn long_press_is_a_zero_distance_swipe() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[(START, 40, 30)])));
    dispatcher
        .click_template(START, ClickOptions::default().long_press())
        .await
        .unwrap();
    let at = center_of(40, 30);
    assert_eq!(
        dispatcher.device().events(),
        vec![InputEvent::Swipe {
            from: at,
            to: at,
            duration_ms: Some(0),
        }]
    );
}

#[tokio::test]
async fn hold_moves_one_pixel() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[(START, 40, 30)])));
    assert!(dispatcher.hold_template(START).await.unwrap());
    let (x, y) = center_of(40, 30);
    assert_eq!(
        dispatcher.device().events(),
        vec![InputEvent::Swipe {
            from: (x, y),
            to: (x + 1, y + 1),
            duration_ms: Some(0),
        }]
    );

    let missing = basic(MockDevice::new(&screen_with(&[])));
    assert!(!missing.hold_template(START).await.unwrap());
    assert_eq!(missing.device().input_count(), 0);
}

#[tokio::test]
async fn wait_while_present_returns_once_gone() {
    let with_auto = screen_with(&[(AUTO, 130, 10)]);
    let without = screen_with(&[]);
    let device = MockDevice::with_screens(&[with_auto.clone(), with_auto, without]);
    let dispatcher = basic(device);
    let seen = dispatcher
        .wait_while_present(AUTO, PollConfig::new(5, Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(seen, 2);
}

#[tokio::test]
async fn wait_while_present_times_out() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[(AUTO, 130, 10)])));
    let err = dispatcher
        .wait_while_present(AUTO, PollConfig::new(3, Duration::ZERO))
        .await
        .unwrap_err();
    match err {
        AutomationError::Timeout { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn wait_while_absent_returns_once_shown() {
    let device = MockDevice::with_screens(&[screen_with(&[]), screen_with(&[(VICTORY, 40, 20)])]);
    let dispatcher = basic(device);
    let seen = dispatcher
        .wait_while_absent(VICTORY, PollConfig::new(5, Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(seen, 1);
}

#[tokio::test]
async fn dismiss_taps_until_gone() {
    let overlay = screen_with(&[(START_2, 60, 50)]);
    let device = MockDevice::with_screens(&[overlay.clone(), overlay, screen_with(&[])]);
    let dispatcher = basic(device);
    let clicks = dispatcher
        .dismiss_while_present(START_2, PollConfig::new(5, Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(clicks, 2);
    assert_eq!(dispatcher.device().taps(), vec![center_of(60, 50); 2]);
}

#[tokio::test]
async fn cancelled_dispatcher_sends_nothing() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[(START, 40, 30)])));
    dispatcher.cancel_token().cancel();
    let err = dispatcher
        .click_template(START, ClickOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AutomationError::Cancelled));
    assert_eq!(dispatcher.device().input_count(), 0);
}

#[tokio::test]
async fn sleep_wakes_on_cancel() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[])));
    let token = dispatcher.cancel_token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });
    let err = dispatcher.sleep(Duration::from_secs(60)).await.unwrap_err();
    assert!(matches!(err, AutomationError::Cancelled));
}

#[tokio::test]
async fn key_events_and_text() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[])));
    dispatcher.back().await.unwrap();
    dispatcher.wake_screen().await.unwrap();
    dispatcher.enter_text("hello world").await.unwrap();
    assert_eq!(
        dispatcher.device().events(),
        vec![
            InputEvent::Shell("input keyevent 4".into()),
            InputEvent::Shell("input keyevent 224".into()),
            InputEvent::Shell("input text hello%sworld".into()),
        ]
    );
}

#[tokio::test]
async fn joystick_swipes_from_center_or_presses_in_place() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[])));
    let mut stick = Joystick {
        center: MatchPoint::new(50, 60),
        shown: false,
    };
    dispatcher
        .joystick(stick, 20.0, 0.0, Duration::from_millis(200))
        .await
        .unwrap();
    stick.shown = true;
    dispatcher
        .joystick(stick, 20.0, 90.0, Duration::from_millis(200))
        .await
        .unwrap();
    assert_eq!(
        dispatcher.device().events(),
        vec![
            InputEvent::Swipe {
                from: (50, 60),
                to: (70, 60),
                duration_ms: Some(200),
            },
            InputEvent::Swipe {
                from: (50, 80),
                to: (50, 80),
                duration_ms: Some(200),
            },
        ]
    );
}

#[tokio::test]
async fn start_app_only_when_not_running() {
    let dispatcher = basic(MockDevice::new(&screen_with(&[])));
    assert!(dispatcher.start_if_not_running("com.example.game").await.unwrap());
    assert!(!dispatcher.start_if_not_running("com.example.game").await.unwrap());
    assert!(dispatcher.is_app_running("com.example.game").await.unwrap());
    dispatcher.stop_app("com.example.game").await.unwrap();
    let launches = dispatcher
        .device()
        .events()
        .into_iter()
        .filter(|e| matches!(e, InputEvent::Shell(cmd) if cmd.starts_with("monkey")))
        .count();
    assert_eq!(launches, 1);
}

#[tokio::test]
async fn capture_failure_is_fatal() {
    let dispatcher = basic(MockDevice::disconnected(160, 120));
    let err = dispatcher.check_screen(START).await.unwrap_err();
    assert!(matches!(
        err,
        AutomationError::Device(AdbError::Timeout { .. })
    ));
    assert!(err.is_fatal());
}

fn engine(
    device: MockDevice,
    components: &[Component],
    playbook: PlaybookKind,
    timings: Timings,
) -> (
    ScreenStateEngine<MockDevice>,
    watch::Receiver<SessionStatus>,
) {
    let dispatcher = dispatcher_for(device, components, timings);
    let (tx, rx) = watch::channel(SessionStatus::new("mock-device"));
    (
        ScreenStateEngine::new(dispatcher, playbook, "com.example.game", tx),
        rx,
    )
}

#[tokio::test]
async fn detect_state_classifies_screens() {
    use super::playbook::basic_play::DEFEAT;
    let inventory = Component::BasicPlay.template(TemplateId::Inventory);
    let cases = [
        (screen_with(&[(inventory, 10, 10), (START, 100, 80)]), ScreenState::Home),
        (screen_with(&[(inventory, 10, 10)]), ScreenState::Unknown),
        (screen_with(&[(VICTORY, 40, 20)]), ScreenState::Victory),
        (screen_with(&[(DEFEAT, 40, 20)]), ScreenState::Defeat),
        (screen_with(&[(AUTO, 130, 10)]), ScreenState::InActivity),
        (screen_with(&[(LOCK, 70, 50)]), ScreenState::Locked),
    ];
    for (screen, expected) in cases {
        let (engine, _) = engine(
            MockDevice::new(&screen),
            &[Component::BasicPlay, Component::UnlockPhone],
            PlaybookKind::BasicPlay,
            Timings::zero(),
        );
        assert_eq!(engine.detect_state().await.unwrap(), expected);
    }
}

#[tokio::test]
async fn run_publishes_status() {
    let inventory = Component::BasicPlay.template(TemplateId::Inventory);
    let home = screen_with(&[(inventory, 10, 10), (START, 100, 80)]);
    let stage = screen_with(&[(START_2, 60, 50)]);
    let auto = screen_with(&[(AUTO, 130, 10)]);
    let result = screen_with(&[(VICTORY, 40, 20), (CONTINUE, 40, 80)]);
    let device =
        MockDevice::with_screens(&[home.clone(), home.clone(), home, stage, auto, result]);
    let (mut engine, rx) = engine(
        device,
        &[Component::BasicPlay],
        PlaybookKind::BasicPlay,
        Timings::zero(),
    );

    assert_eq!(engine.run().await.unwrap(), ScreenState::Victory);
    let status = rx.borrow().clone();
    assert_eq!(status.iterations, 1);
    assert_eq!(status.state, ScreenState::Victory);
    assert_eq!(status.consecutive_failures, 0);
    assert!(status.last_action.contains("continue"), "{}", status.last_action);
}

#[tokio::test]
async fn failed_iteration_counts_consecutive_failures() {
    let mut timings = Timings::zero();
    timings.recovery_attempts = 1;
    let (mut engine, rx) = engine(
        MockDevice::new(&screen_with(&[])),
        &[Component::BasicPlay],
        PlaybookKind::BasicPlay,
        timings,
    );
    for expected in 1..=2 {
        let err = engine.run().await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(rx.borrow().consecutive_failures, expected);
    }
    assert_eq!(engine.status().iterations, 2);
}

#[tokio::test]
async fn cancelled_engine_does_not_run() {
    let (mut engine, _) = engine(
        MockDevice::new(&screen_with(&[])),
        &[Component::BasicPlay],
        PlaybookKind::BasicPlay,
        Timings::zero(),
    );
    engine.dispatcher().cancel_token().cancel();
    assert!(matches!(
        engine.run().await.unwrap_err(),
        AutomationError::Cancelled
    ));
    assert_eq!(engine.dispatcher().device().input_count(), 0);
}

#[tokio::test]
async fn black_frame_never_sends_the_power_key() {
    let mut timings = Timings::zero();
    timings.recovery_attempts = 1;
    let (mut engine, _rx) = engine(
        MockDevice::new(&solid(160, 120, 0)),
        &[Component::BasicPlay, Component::UnlockPhone],
        PlaybookKind::BasicPlay,
        timings,
    );
    let _ = engine.run().await;
    let events = engine.dispatcher().device().events();
    assert_eq!(events[0], InputEvent::Shell("input keyevent 224".into()));
    assert!(!events.contains(&InputEvent::Shell("input keyevent 26".into())));
}
