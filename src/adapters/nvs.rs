//! NVS-backed persistence adapter.
//!
//! Implements [`ConfigPort`] and [`StoragePort`] on the ESP-IDF
//! non-volatile storage API. Values are serialized with `postcard`
//! (compact, no_std-friendly) before landing in NVS blobs.
//!
//! On the host the same surface is backed by an in-memory map so the
//! service and tests run unchanged.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::UpdateConfig;

const CONFIG_NAMESPACE: &str = "otaguard";
const CONFIG_KEY: &str = "upd_cfg";

/// Largest blob we will read back. Config and crash entries are far
/// smaller; this bounds the stack buffer on target.
pub const MAX_BLOB_LEN: usize = 512;

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod backend {
    use super::*;
    use esp_idf_svc::sys::{
        nvs_close, nvs_commit, nvs_erase_key, nvs_get_blob, nvs_handle_t, nvs_open,
        nvs_open_mode_t_NVS_READWRITE, nvs_set_blob, ESP_ERR_NVS_NOT_FOUND, ESP_OK,
    };

    pub struct NvsBackend;

    /// RAII wrapper so every path closes the handle.
    struct Handle(nvs_handle_t);

    impl Drop for Handle {
        fn drop(&mut self) {
            unsafe { nvs_close(self.0) };
        }
    }

    fn to_cstr(s: &str, buf: &mut [u8; 32]) -> Result<(), StorageError> {
        // NVS limits namespaces and keys to 15 chars; anything longer is
        // a programming error surfaced as IoError.
        if s.len() >= buf.len() || s.contains('\0') {
            return Err(StorageError::IoError);
        }
        buf[..s.len()].copy_from_slice(s.as_bytes());
        buf[s.len()] = 0;
        Ok(())
    }

    fn open(namespace: &str) -> Result<Handle, StorageError> {
        let mut ns_buf = [0u8; 32];
        to_cstr(namespace, &mut ns_buf)?;
        let mut handle: nvs_handle_t = 0;
        let ret = unsafe {
            nvs_open(
                ns_buf.as_ptr().cast(),
                nvs_open_mode_t_NVS_READWRITE,
                &mut handle,
            )
        };
        if ret != ESP_OK {
            return Err(StorageError::IoError);
        }
        Ok(Handle(handle))
    }

    impl NvsBackend {
        pub fn new() -> Result<Self, StorageError> {
            Ok(Self)
        }

        pub fn read(
            &self,
            namespace: &str,
            key: &str,
            buf: &mut [u8],
        ) -> Result<usize, StorageError> {
            let handle = open(namespace)?;
            let mut key_buf = [0u8; 32];
            to_cstr(key, &mut key_buf)?;
            let mut len = buf.len();
            let ret = unsafe {
                nvs_get_blob(
                    handle.0,
                    key_buf.as_ptr().cast(),
                    buf.as_mut_ptr().cast(),
                    &mut len,
                )
            };
            match ret {
                ESP_OK => Ok(len),
                ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                _ => Err(StorageError::IoError),
            }
        }

        pub fn write(
            &mut self,
            namespace: &str,
            key: &str,
            data: &[u8],
        ) -> Result<(), StorageError> {
            let handle = open(namespace)?;
            let mut key_buf = [0u8; 32];
            to_cstr(key, &mut key_buf)?;
            let ret = unsafe {
                nvs_set_blob(
                    handle.0,
                    key_buf.as_ptr().cast(),
                    data.as_ptr().cast(),
                    data.len(),
                )
            };
            if ret != ESP_OK {
                return Err(StorageError::IoError);
            }
            let ret = unsafe { nvs_commit(handle.0) };
            if ret != ESP_OK {
                return Err(StorageError::IoError);
            }
            Ok(())
        }

        pub fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
            let handle = open(namespace)?;
            let mut key_buf = [0u8; 32];
            to_cstr(key, &mut key_buf)?;
            let ret = unsafe { nvs_erase_key(handle.0, key_buf.as_ptr().cast()) };
            match ret {
                ESP_OK | ESP_ERR_NVS_NOT_FOUND => {
                    let ret = unsafe { nvs_commit(handle.0) };
                    if ret == ESP_OK {
                        Ok(())
                    } else {
                        Err(StorageError::IoError)
                    }
                }
                _ => Err(StorageError::IoError),
            }
        }

        pub fn exists(&self, namespace: &str, key: &str) -> bool {
            let mut probe = [0u8; super::MAX_BLOB_LEN];
            self.read(namespace, key, &mut probe).is_ok()
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod backend {
    use super::*;
    use std::collections::HashMap;

    pub struct NvsBackend {
        store: HashMap<(String, String), Vec<u8>>,
    }

    impl NvsBackend {
        pub fn new() -> Result<Self, StorageError> {
            info!("NVS(sim): in-memory store");
            Ok(Self {
                store: HashMap::new(),
            })
        }

        pub fn read(
            &self,
            namespace: &str,
            key: &str,
            buf: &mut [u8],
        ) -> Result<usize, StorageError> {
            let data = self
                .store
                .get(&(namespace.to_owned(), key.to_owned()))
                .ok_or(StorageError::NotFound)?;
            if data.len() > buf.len() {
                return Err(StorageError::IoError);
            }
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }

        pub fn write(
            &mut self,
            namespace: &str,
            key: &str,
            data: &[u8],
        ) -> Result<(), StorageError> {
            self.store
                .insert((namespace.to_owned(), key.to_owned()), data.to_vec());
            Ok(())
        }

        pub fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
            self.store.remove(&(namespace.to_owned(), key.to_owned()));
            Ok(())
        }

        pub fn exists(&self, namespace: &str, key: &str) -> bool {
            self.store
                .contains_key(&(namespace.to_owned(), key.to_owned()))
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct NvsAdapter {
    backend: backend::NvsBackend,
}

impl NvsAdapter {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            backend: backend::NvsBackend::new()?,
        })
    }

    fn validate(config: &UpdateConfig) -> Result<(), ConfigError> {
        if config.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_secs must be nonzero",
            ));
        }
        if config.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "tick_interval_ms must be nonzero",
            ));
        }
        if config.version_url.is_empty() || config.firmware_url.is_empty() {
            return Err(ConfigError::ValidationFailed("update URLs must be set"));
        }
        Ok(())
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<UpdateConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_LEN];
        let len = match self.backend.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => {
                info!("config: no stored config, using defaults");
                return Ok(UpdateConfig::default());
            }
            Err(_) => return Err(ConfigError::IoError),
        };
        match postcard::from_bytes::<UpdateConfig>(&buf[..len]) {
            Ok(config) => {
                Self::validate(&config)?;
                Ok(config)
            }
            Err(_) => {
                // A corrupt blob must never brick the updater.
                warn!("config: stored blob corrupt, falling back to defaults");
                Ok(UpdateConfig::default())
            }
        }
    }

    fn save(&mut self, config: &UpdateConfig) -> Result<(), ConfigError> {
        Self::validate(config)?;
        let mut buf = [0u8; MAX_BLOB_LEN];
        let used = postcard::to_slice(config, &mut buf)
            .map_err(|_| ConfigError::ValidationFailed("config does not fit blob buffer"))?;
        self.backend
            .write(CONFIG_NAMESPACE, CONFIG_KEY, used)
            .map_err(|_| ConfigError::IoError)?;
        info!("config: saved ({} bytes)", used.len());
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.backend.read(namespace, key, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.backend.write(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.backend.delete(namespace, key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.backend.exists(namespace, key)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests (host backend)
// ───────────────────────────────────────────────────────────────
