//! Integration tests for boot validation and rollback commit behaviour.
//!
//! Drives [`UpdateService`] across simulated boots with different
//! persisted boot states and asserts on the mark-valid call history.

use crate::mock_platform::{MockRestart, MockSlotStore, MockTransport, RecordingSink, SlotCall};

use otaguard::app::events::AppEvent;
use otaguard::app::ports::BootState;
use otaguard::app::service::UpdateService;
use otaguard::config::UpdateConfig;
use otaguard::error::SlotError;

const VERSION_URL: &str = "http://192.168.1.208:8080/version.txt";

fn boot(boot_state: BootState) -> (UpdateService, MockTransport, MockSlotStore) {
    let mut transport = MockTransport::new();
    transport.put(VERSION_URL, otaguard::version::CURRENT.as_bytes());
    let slots = MockSlotStore::with_boot_state(boot_state);
    let service = UpdateService::new(UpdateConfig::default(), &slots, 0);
    (service, transport, slots)
}

fn tick(
    service: &mut UpdateService,
    transport: &mut MockTransport,
    slots: &mut MockSlotStore,
    now_secs: u64,
    health_ok: bool,
) -> (MockRestart, RecordingSink) {
    let mut restart = MockRestart::new();
    let mut sink = RecordingSink::new();
    service.tick(now_secs, health_ok, transport, slots, &mut restart, &mut sink);
    (restart, sink)
}

// Default validation window is 60 s.

#[test]
fn pending_verify_commits_once_after_the_window_elapses() {
    let (mut service, mut transport, mut slots) = boot(BootState::PendingVerify);
    assert!(!service.validated());

    // Health confirmed early: the window has not elapsed, no commit yet.
    tick(&mut service, &mut transport, &mut slots, 10, true);
    assert_eq!(slots.mark_valid_calls(), 0);
    assert!(!service.validated());

    // First tick past the deadline commits.
    let (_, sink) = tick(&mut service, &mut transport, &mut slots, 70, true);
    assert_eq!(slots.mark_valid_calls(), 1);
    assert!(service.validated());
    assert_eq!(sink.count_validated(), 1);
    assert_eq!(slots.boot_state, BootState::Valid);

    // Later ticks never re-issue the call.
    tick(&mut service, &mut transport, &mut slots, 130, true);
    tick(&mut service, &mut transport, &mut slots, 190, true);
    assert_eq!(slots.mark_valid_calls(), 1);
}

#[test]
fn new_image_is_treated_like_pending_verify() {
    let (mut service, mut transport, mut slots) = boot(BootState::New);
    tick(&mut service, &mut transport, &mut slots, 60, true);
    assert_eq!(slots.mark_valid_calls(), 1);
    assert!(service.validated());
}

#[test]
fn already_valid_image_is_never_re_marked() {
    let (mut service, mut transport, mut slots) = boot(BootState::Valid);
    assert!(service.validated());

    tick(&mut service, &mut transport, &mut slots, 70, true);
    tick(&mut service, &mut transport, &mut slots, 700, true);
    assert_eq!(slots.mark_valid_calls(), 0);
}

#[test]
fn aborted_image_gets_no_validation_attempt() {
    let (mut service, mut transport, mut slots) = boot(BootState::Aborted);
    assert!(!service.validated());

    tick(&mut service, &mut transport, &mut slots, 120, true);
    assert_eq!(slots.mark_valid_calls(), 0);
    assert!(!service.validated());
}

#[test]
fn undefined_boot_state_is_informational_only() {
    let (mut service, mut transport, mut slots) = boot(BootState::Undefined);
    tick(&mut service, &mut transport, &mut slots, 120, true);
    assert_eq!(slots.mark_valid_calls(), 0);
}

#[test]
fn commit_waits_for_health_even_past_the_deadline() {
    let (mut service, mut transport, mut slots) = boot(BootState::PendingVerify);

    // Deadline long past but the link is down: never mark valid.
    tick(&mut service, &mut transport, &mut slots, 300, false);
    assert_eq!(slots.mark_valid_calls(), 0);
    assert!(!service.validated());

    // Health returns: commit on the next tick.
    tick(&mut service, &mut transport, &mut slots, 360, true);
    assert_eq!(slots.mark_valid_calls(), 1);
    assert!(service.validated());
}

#[test]
fn failed_mark_valid_is_reported_and_not_retried_this_boot() {
    let (mut service, mut transport, mut slots) = boot(BootState::PendingVerify);
    slots.fail_mark_valid_code = Some(-1);

    let (_, sink) = tick(&mut service, &mut transport, &mut slots, 70, true);
    assert_eq!(slots.mark_valid_calls(), 1);
    assert!(!service.validated());
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ValidationFailed(SlotError::MarkValidFailed(-1))
    )));

    // No automatic retry for the rest of this boot.
    tick(&mut service, &mut transport, &mut slots, 130, true);
    tick(&mut service, &mut transport, &mut slots, 190, true);
    assert_eq!(slots.mark_valid_calls(), 1);
}

#[test]
fn validation_and_polling_coexist_on_the_same_tick() {
    let (mut service, mut transport, mut slots) = boot(BootState::PendingVerify);

    // Tick past both the validation window and the poll interval: the
    // supervisor commits and the poller still runs its version check.
    let (_, sink) = tick(&mut service, &mut transport, &mut slots, 70, true);

    assert_eq!(slots.mark_valid_calls(), 1);
    assert!(sink.events.iter().any(|e| matches!(e, AppEvent::UpToDate)));
    assert_eq!(transport.fetch_count, 1);
    // The up-to-date poll never opened a write session.
    assert!(!slots.calls.iter().any(|c| matches!(c, SlotCall::BeginWrite(_))));
}
