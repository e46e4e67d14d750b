//! In-memory parameter store.
//!
//! Implements [`ParamStore`] with one postcard-encoded blob per channel,
//! the same shape a flash key-value backend would persist.  Used on the
//! host and as the boot-time store until a persistent backend is wired in.

use std::collections::HashMap;

use log::{debug, warn};

use crate::CHANNEL_COUNT;
use crate::app::ports::ParamStore;
use crate::config::ProtectionParams;
use crate::error::ConfigError;

#[derive(Debug, Default)]
pub struct MemoryParamStore {
    blobs: HashMap<usize, Vec<u8>>,
}

impl MemoryParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_channel(channel: usize) -> Result<(), ConfigError> {
        if channel < CHANNEL_COUNT {
            Ok(())
        } else {
            Err(ConfigError::UnknownChannel(channel))
        }
    }
}

impl ParamStore for MemoryParamStore {
    fn load(&self, channel: usize) -> Result<ProtectionParams, ConfigError> {
        Self::check_channel(channel)?;
        let blob = self.blobs.get(&channel).ok_or(ConfigError::NotFound)?;
        postcard::from_bytes(blob).map_err(|e| {
            warn!("params {}: corrupt blob: {}", channel + 1, e);
            ConfigError::Storage
        })
    }

    fn save(&mut self, channel: usize, params: &ProtectionParams) -> Result<(), ConfigError> {
        Self::check_channel(channel)?;
        let blob = postcard::to_allocvec(params).map_err(|_| ConfigError::Storage)?;
        debug!("params {}: stored {} bytes", channel + 1, blob.len());
        self.blobs.insert(channel, blob);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ConfigError> {
        self.blobs.clear();
        Ok(())
    }
}
