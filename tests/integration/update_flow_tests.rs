//! Integration tests for the full poll → verify → install pipeline.
//!
//! These run on the host and drive [`UpdateService`] through mock
//! adapters, asserting on the recorded slot-store call history and the
//! emitted event stream.

use crate::mock_platform::{MockRestart, MockSlotStore, MockTransport, RecordingSink, SlotCall};

use sha2::{Digest, Sha256};

use otaguard::app::events::AppEvent;
use otaguard::app::service::UpdateService;
use otaguard::config::UpdateConfig;
use otaguard::error::UpdateError;
use otaguard::update::installer::RejectReason;

const VERSION_URL: &str = "http://192.168.1.208:8080/version.txt";
const FIRMWARE_URL: &str = "http://192.168.1.208:8080/firmware.bin";
const DIGEST_URL: &str = "http://192.168.1.208:8080/firmware.sha256";

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

struct Harness {
    service: UpdateService,
    transport: MockTransport,
    slots: MockSlotStore,
    restart: MockRestart,
    sink: RecordingSink,
}

impl Harness {
    /// Service booted at t=0 on an already-valid image, remote publishing
    /// `remote_version`.
    fn new(remote_version: &str) -> Self {
        let mut transport = MockTransport::new();
        transport.put(VERSION_URL, remote_version.as_bytes());
        let slots = MockSlotStore::new();
        let service = UpdateService::new(UpdateConfig::default(), &slots, 0);
        Self {
            service,
            transport,
            slots,
            restart: MockRestart::new(),
            sink: RecordingSink::new(),
        }
    }

    fn publish_firmware(&mut self, body: &[u8], digest: &str) {
        self.transport.put(FIRMWARE_URL, body.to_vec());
        self.transport.put(DIGEST_URL, digest.as_bytes());
    }

    fn tick(&mut self, now_secs: u64) {
        self.service.tick(
            now_secs,
            true,
            &mut self.transport,
            &mut self.slots,
            &mut self.restart,
            &mut self.sink,
        );
    }
}

// ── Happy path ────────────────────────────────────────────────

#[test]
fn matching_version_emits_up_to_date_and_touches_nothing() {
    let mut h = Harness::new(otaguard::version::CURRENT);
    h.tick(0);

    assert!(matches!(h.sink.events.as_slice(), [AppEvent::UpToDate]));
    assert!(h.slots.untouched());
    assert!(!h.restart.requested());
}

#[test]
fn new_release_installs_and_schedules_restart() {
    let body = image(1000);
    let digest = sha256_hex(&body);
    let mut h = Harness::new("3.0.0");
    h.publish_firmware(&body, &digest);

    h.tick(0);

    assert_eq!(h.slots.finalized_image(), Some(body.as_slice()));
    assert_eq!(h.restart.requests, vec![UpdateConfig::default().restart_grace_ms]);
    assert!(h
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::UpdateInstalled { remote_version } if remote_version == "3.0.0")));
    // Verify pass + install pass: the image was fetched exactly twice.
    assert_eq!(h.transport.stream_count, 2);
}

#[test]
fn version_with_trailing_whitespace_is_trimmed() {
    let mut h = Harness::new(&format!("{}\n", otaguard::version::CURRENT));
    h.tick(0);
    assert!(matches!(h.sink.events.as_slice(), [AppEvent::UpToDate]));
}

#[test]
fn uppercase_published_digest_still_matches() {
    let body = image(256);
    let digest = sha256_hex(&body).to_ascii_uppercase();
    let mut h = Harness::new("3.0.0");
    h.publish_firmware(&body, &digest);

    h.tick(0);
    assert!(h.restart.requested());
}

#[test]
fn zero_length_image_is_a_legitimate_install() {
    let digest = sha256_hex(&[]);
    let mut h = Harness::new("3.0.0");
    h.publish_firmware(&[], &digest);

    h.tick(0);

    assert_eq!(h.slots.finalized_image(), Some([].as_slice()));
    assert!(h.restart.requested());
}

// ── Reject before write ───────────────────────────────────────

#[test]
fn checksum_mismatch_never_touches_the_slot() {
    let body = image(1000);
    let mut h = Harness::new("3.0.0");
    h.publish_firmware(&body, &sha256_hex(b"some other image"));

    h.tick(0);

    assert!(h.slots.untouched(), "slot calls: {:?}", h.slots.calls);
    assert!(!h.restart.requested());
    assert!(h
        .sink
        .events
        .iter()
        .any(|e| matches!(
            e,
            AppEvent::UpdateRejected(RejectReason::ChecksumMismatch { .. })
        )));
}

// ── Transport failures ────────────────────────────────────────

#[test]
fn version_fetch_failure_aborts_the_cycle() {
    let mut h = Harness::new("3.0.0");
    h.transport.put_status(VERSION_URL, 503);

    h.tick(0);

    assert!(h.slots.untouched());
    assert!(h
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::UpdateFailed(UpdateError::Transport(_)))));
}

#[test]
fn missing_digest_resource_fails_before_any_download() {
    let mut h = Harness::new("3.0.0");
    h.transport.put(FIRMWARE_URL, image(100));
    // No digest resource published.

    h.tick(0);

    assert!(h.slots.untouched());
    assert_eq!(h.transport.stream_count, 0);
    assert!(h
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::UpdateFailed(UpdateError::DigestUnavailable(_)))));
}

#[test]
fn truncated_verify_stream_is_rejected_before_write() {
    let body = image(500);
    let mut h = Harness::new("3.0.0");
    h.publish_firmware(&body, &sha256_hex(&body));
    // Server declares 1000 bytes but only delivers 500.
    h.transport.put_truncated(FIRMWARE_URL, body, 1000);

    h.tick(0);

    assert!(h.slots.untouched());
    assert!(h.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::UpdateFailed(UpdateError::TruncatedStream {
            expected: 1000,
            read: 500
        })
    )));
}

// ── Write-pass failures ───────────────────────────────────────

#[test]
fn begin_write_refusal_surfaces_as_insufficient_space() {
    let body = image(300);
    let digest = sha256_hex(&body);
    let mut h = Harness::new("3.0.0");
    h.publish_firmware(&body, &digest);
    h.slots.refuse_begin = true;

    h.tick(0);

    assert!(h.slots.finalized_image().is_none());
    assert!(!h.restart.requested());
    assert!(h
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::UpdateFailed(UpdateError::InsufficientSpace))));
}

#[test]
fn short_write_aborts_the_session() {
    let body = image(1000);
    let digest = sha256_hex(&body);
    let mut h = Harness::new("3.0.0");
    h.publish_firmware(&body, &digest);
    h.slots.accept_at_most = Some(600);

    h.tick(0);

    assert!(h.slots.calls.contains(&SlotCall::Abort));
    assert!(h.slots.finalized_image().is_none());
    assert!(!h.restart.requested());
    assert!(h.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::UpdateFailed(UpdateError::ShortWrite {
            expected: 1000,
            written: 600
        })
    )));
}

#[test]
fn stream_error_during_write_pass_aborts_the_session() {
    let body = image(1000);
    let digest = sha256_hex(&body);
    let mut h = Harness::new("3.0.0");
    h.publish_firmware(&body, &digest);
    // Verify pass (first open) stays healthy; the write pass (second
    // open) dies after 200 bytes.
    h.transport.fail_stream_after(FIRMWARE_URL, 2, 200);

    h.tick(0);

    assert!(h.slots.calls.contains(&SlotCall::Abort));
    assert!(h.slots.finalized_image().is_none());
    assert!(!h.restart.requested());
}

#[test]
fn finalize_failure_is_reported_with_the_platform_code() {
    let body = image(128);
    let digest = sha256_hex(&body);
    let mut h = Harness::new("3.0.0");
    h.publish_firmware(&body, &digest);
    h.slots.fail_finalize_code = Some(-262);

    h.tick(0);

    assert!(!h.restart.requested());
    assert!(h
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::UpdateFailed(UpdateError::FinalizeFailed(-262)))));
}

// ── Cadence and health gating ─────────────────────────────────

#[test]
fn polls_immediately_on_first_tick_then_respects_interval() {
    let mut h = Harness::new(otaguard::version::CURRENT);

    h.tick(0); // fires immediately
    h.tick(30); // mid-interval, suppressed
    h.tick(60); // due again

    assert_eq!(h.transport.fetch_count, 2);
}

#[test]
fn polling_is_suppressed_while_link_is_down() {
    let mut h = Harness::new("3.0.0");
    h.service.tick(
        0,
        false, // link down
        &mut h.transport,
        &mut h.slots,
        &mut h.restart,
        &mut h.sink,
    );

    assert_eq!(h.transport.fetch_count, 0);
    assert!(h.sink.events.is_empty());
}

#[test]
fn failed_attempt_retries_wholesale_on_the_next_cycle() {
    let body = image(400);
    let digest = sha256_hex(&body);
    let mut h = Harness::new("3.0.0");
    h.publish_firmware(&body, &digest);
    h.transport.put_status(FIRMWARE_URL, 500);

    h.tick(0);
    assert!(h.slots.untouched());

    // Server recovers before the next poll.
    h.transport.put_status(FIRMWARE_URL, 200);
    h.tick(60);

    assert_eq!(h.slots.finalized_image(), Some(body.as_slice()));
    assert!(h.restart.requested());
}
