//! OTA slot store adapter.
//!
//! Implements [`SlotStore`] over the dual app partitions. On target the
//! write session goes through the `esp-ota` crate (RAII: dropping an
//! unfinalized session aborts it); boot-state queries and rollback
//! cancellation use the `esp_ota_*` FFI directly because the wrapper
//! hides the `esp_err_t` codes the caller reports.
//!
//! The host backend is an in-memory slot with injectable failures so the
//! controller's abort and short-write paths can be exercised in tests.

use log::{info, warn};

use crate::app::ports::{BootState, SlotStore};
use crate::error::SlotError;

/// Hard cap on accepted image size, independent of partition geometry.
pub const MAX_FIRMWARE_SIZE: u64 = 4 * 1024 * 1024;

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod backend {
    use super::*;
    use esp_idf_svc::sys::{
        esp_ota_get_next_update_partition, esp_ota_get_running_partition,
        esp_ota_get_state_partition, esp_ota_img_states_t,
        esp_ota_img_states_t_ESP_OTA_IMG_ABORTED, esp_ota_img_states_t_ESP_OTA_IMG_INVALID,
        esp_ota_img_states_t_ESP_OTA_IMG_NEW, esp_ota_img_states_t_ESP_OTA_IMG_PENDING_VERIFY,
        esp_ota_img_states_t_ESP_OTA_IMG_VALID, esp_ota_mark_app_valid_cancel_rollback,
        ESP_ERR_FLASH_OP_FAIL, ESP_ERR_FLASH_OP_TIMEOUT, ESP_ERR_INVALID_STATE, ESP_ERR_NO_MEM,
        ESP_ERR_OTA_SELECT_INFO_INVALID, ESP_ERR_OTA_VALIDATE_FAILED, ESP_FAIL, ESP_OK,
    };
    use esp_ota::{ErrorKind, OtaUpdate};

    fn kind_to_code(kind: ErrorKind) -> i32 {
        match kind {
            ErrorKind::AllocFailed => ESP_ERR_NO_MEM,
            ErrorKind::FlashTimeout => ESP_ERR_FLASH_OP_TIMEOUT,
            ErrorKind::FlashFailed | ErrorKind::WritingEncryptedFailed => ESP_ERR_FLASH_OP_FAIL,
            ErrorKind::InvalidOtaPartitionData => ESP_ERR_OTA_SELECT_INFO_INVALID,
            ErrorKind::InvalidImage | ErrorKind::InvalidMagicByte => ESP_ERR_OTA_VALIDATE_FAILED,
            ErrorKind::InvalidRollbackState | ErrorKind::NothingWritten => ESP_ERR_INVALID_STATE,
            _ => ESP_FAIL,
        }
    }

    pub struct EspSlotStore {
        session: Option<OtaUpdate>,
        boot_state: BootState,
    }

    impl EspSlotStore {
        pub fn new() -> Self {
            let boot_state = query_boot_state();
            info!("slots: running image state {:?}", boot_state);
            Self {
                session: None,
                boot_state,
            }
        }
    }

    #[allow(non_upper_case_globals)]
    fn query_boot_state() -> BootState {
        let running = unsafe { esp_ota_get_running_partition() };
        if running.is_null() {
            return BootState::Undefined;
        }
        let mut state: esp_ota_img_states_t = 0;
        let ret = unsafe { esp_ota_get_state_partition(running, &mut state) };
        if ret != ESP_OK {
            return BootState::Undefined;
        }
        match state {
            esp_ota_img_states_t_ESP_OTA_IMG_NEW => BootState::New,
            esp_ota_img_states_t_ESP_OTA_IMG_PENDING_VERIFY => BootState::PendingVerify,
            esp_ota_img_states_t_ESP_OTA_IMG_VALID => BootState::Valid,
            esp_ota_img_states_t_ESP_OTA_IMG_ABORTED
            | esp_ota_img_states_t_ESP_OTA_IMG_INVALID => BootState::Aborted,
            _ => BootState::Undefined,
        }
    }

    impl SlotStore for EspSlotStore {
        fn begin_write(&mut self, expected_len: u64) -> Result<(), SlotError> {
            if self.session.is_some() {
                return Err(SlotError::SessionActive);
            }
            if expected_len > MAX_FIRMWARE_SIZE {
                return Err(SlotError::InsufficientSpace);
            }
            let target = unsafe { esp_ota_get_next_update_partition(core::ptr::null()) };
            if target.is_null() {
                return Err(SlotError::InsufficientSpace);
            }
            if expected_len > u64::from(unsafe { (*target).size }) {
                return Err(SlotError::InsufficientSpace);
            }

            let update = OtaUpdate::begin().map_err(|e| {
                warn!("slots: begin failed: {}", e);
                SlotError::InsufficientSpace
            })?;
            self.session = Some(update);
            info!("slots: write session open ({} bytes)", expected_len);
            Ok(())
        }

        fn write_chunk(&mut self, data: &[u8]) -> Result<usize, SlotError> {
            let Some(session) = self.session.as_mut() else {
                return Err(SlotError::NoSession);
            };
            session.write(data).map_err(|e| {
                warn!("slots: write failed: {}", e);
                SlotError::WriteFailed
            })?;
            Ok(data.len())
        }

        fn finalize(&mut self) -> Result<(), SlotError> {
            let Some(session) = self.session.take() else {
                return Err(SlotError::NoSession);
            };
            let mut completed = session
                .finalize()
                .map_err(|e| SlotError::FinalizeFailed(kind_to_code(e.kind())))?;
            completed
                .set_as_boot_partition()
                .map_err(|e| SlotError::FinalizeFailed(kind_to_code(e.kind())))?;
            info!("slots: image finalized, inactive slot set bootable");
            Ok(())
        }

        fn abort(&mut self) {
            // Dropping an OtaUpdate aborts the underlying handle.
            if self.session.take().is_some() {
                warn!("slots: write session aborted");
            }
        }

        fn boot_state(&self) -> BootState {
            self.boot_state
        }

        fn mark_valid(&mut self) -> Result<(), SlotError> {
            let ret = unsafe { esp_ota_mark_app_valid_cancel_rollback() };
            if ret != ESP_OK {
                return Err(SlotError::MarkValidFailed(ret));
            }
            self.boot_state = BootState::Valid;
            Ok(())
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod backend {
    use super::*;

    /// In-memory dual-slot stand-in with injectable failures.
    pub struct EspSlotStore {
        capacity: u64,
        boot_state: BootState,
        session: Option<Session>,
        finalized_image: Option<Vec<u8>>,
        marked_valid: bool,
        // Failure injection knobs for tests.
        pub refuse_begin: bool,
        pub accept_at_most: Option<usize>,
        pub fail_finalize_code: Option<i32>,
        pub fail_mark_valid_code: Option<i32>,
    }

    struct Session {
        expected_len: u64,
        buf: Vec<u8>,
    }

    impl EspSlotStore {
        pub fn new() -> Self {
            Self {
                capacity: MAX_FIRMWARE_SIZE,
                boot_state: BootState::Valid,
                session: None,
                finalized_image: None,
                marked_valid: false,
                refuse_begin: false,
                accept_at_most: None,
                fail_finalize_code: None,
                fail_mark_valid_code: None,
            }
        }

        pub fn with_boot_state(boot_state: BootState) -> Self {
            let mut store = Self::new();
            store.boot_state = boot_state;
            store
        }

        pub fn set_capacity(&mut self, capacity: u64) {
            self.capacity = capacity;
        }

        /// Content of the last finalized image, if any.
        pub fn finalized_image(&self) -> Option<&[u8]> {
            self.finalized_image.as_deref()
        }

        pub fn marked_valid(&self) -> bool {
            self.marked_valid
        }

        pub fn session_open(&self) -> bool {
            self.session.is_some()
        }
    }

    impl Default for EspSlotStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SlotStore for EspSlotStore {
        fn begin_write(&mut self, expected_len: u64) -> Result<(), SlotError> {
            if self.session.is_some() {
                return Err(SlotError::SessionActive);
            }
            if self.refuse_begin
                || expected_len > self.capacity
                || expected_len > MAX_FIRMWARE_SIZE
            {
                return Err(SlotError::InsufficientSpace);
            }
            info!("slots(sim): write session open ({} bytes)", expected_len);
            self.session = Some(Session {
                expected_len,
                buf: Vec::with_capacity(expected_len as usize),
            });
            Ok(())
        }

        fn write_chunk(&mut self, data: &[u8]) -> Result<usize, SlotError> {
            let Some(session) = self.session.as_mut() else {
                return Err(SlotError::NoSession);
            };
            let mut accept = data.len();
            if let Some(limit) = self.accept_at_most {
                let room = limit.saturating_sub(session.buf.len());
                accept = accept.min(room);
            }
            session.buf.extend_from_slice(&data[..accept]);
            Ok(accept)
        }

        fn finalize(&mut self) -> Result<(), SlotError> {
            let Some(session) = self.session.take() else {
                return Err(SlotError::NoSession);
            };
            if let Some(code) = self.fail_finalize_code {
                return Err(SlotError::FinalizeFailed(code));
            }
            if session.buf.len() as u64 != session.expected_len {
                return Err(SlotError::FinalizeFailed(-1));
            }
            info!("slots(sim): image finalized ({} bytes)", session.buf.len());
            self.finalized_image = Some(session.buf);
            Ok(())
        }

        fn abort(&mut self) {
            if self.session.take().is_some() {
                warn!("slots(sim): write session aborted");
            }
        }

        fn boot_state(&self) -> BootState {
            self.boot_state
        }

        fn mark_valid(&mut self) -> Result<(), SlotError> {
            if let Some(code) = self.fail_mark_valid_code {
                return Err(SlotError::MarkValidFailed(code));
            }
            self.boot_state = BootState::Valid;
            self.marked_valid = true;
            Ok(())
        }
    }
}

pub use backend::EspSlotStore;

// ───────────────────────────────────────────────────────────────
// Tests (host backend)
// ───────────────────────────────────────────────────────────────
