//! Device session: the single active context and queue of an engine.
//!
//! ```text
//! Uninitialized --ensure_initialized/initialize--> Ready(1)
//! Ready(g)      --initialize-->                    Ready(g + 1)
//! Ready(g)      --shutdown-->                      ShutDown
//! ShutDown      --ensure_initialized/initialize--> Ready(g + 1)
//! ```
//!
//! Selection failures leave the current state untouched.

use std::sync::Arc;

use snafu::{OptionExt, ensure};

use crate::config::{InitOptions, SessionConfig};
use crate::driver::{Context, DeviceInfo, Driver, PlatformInfo};
use crate::error::{
    InvalidDeviceIndexSnafu, InvalidPlatformIndexSnafu, NoDevicesFoundSnafu, NoPlatformsFoundSnafu, Result,
};

/// An open context and the selection that produced it.
#[derive(Clone)]
pub struct ActiveSession {
    context: Arc<dyn Context>,
    platform: usize,
    device: usize,
    generation: u64,
}

impl ActiveSession {
    pub fn context(&self) -> &Arc<dyn Context> {
        &self.context
    }

    pub fn platform(&self) -> usize {
        self.platform
    }

    pub fn device(&self) -> usize {
        self.device
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn device_info(&self) -> &DeviceInfo {
        self.context.device_info()
    }

    /// Whether both refer to the same context object.
    pub fn same_context(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.context, &other.context)
    }
}

impl std::fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("device", &self.context.device_info().name)
            .field("platform", &self.platform)
            .field("index", &self.device)
            .field("generation", &self.generation)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Ready(ActiveSession),
    ShutDown,
}

pub struct Session {
    driver: Arc<dyn Driver>,
    config: SessionConfig,
    state: SessionState,
    /// Generation of the most recent context, 0 before the first one.
    generation: u64,
}

impl Session {
    pub fn new(driver: Arc<dyn Driver>, config: SessionConfig) -> Self {
        Self { driver, config, state: SessionState::Uninitialized, generation: 0 }
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match &self.state {
            SessionState::Ready(active) => Some(active),
            SessionState::Uninitialized | SessionState::ShutDown => None,
        }
    }

    /// The active session, opening the default device if there is none.
    pub fn ensure_initialized(&mut self) -> Result<ActiveSession> {
        match &self.state {
            SessionState::Ready(active) => Ok(active.clone()),
            SessionState::Uninitialized | SessionState::ShutDown => self.initialize(InitOptions::default()),
        }
    }

    /// Select a device and open a new context on it, replacing the current one.
    pub fn initialize(&mut self, options: InitOptions) -> Result<ActiveSession> {
        let platforms = self.driver.platforms()?;
        let count = platforms.len();
        ensure!(count > 0, NoPlatformsFoundSnafu);

        let platform = match options.platform {
            Some(index) => {
                ensure!(index < count, InvalidPlatformIndexSnafu { index, count });
                index
            }
            None if options.gpu => self.first_gpu_platform(count).context(NoDevicesFoundSnafu { platform: None })?,
            None => {
                let index = self.config.platform;
                ensure!(index < count, InvalidPlatformIndexSnafu { index, count });
                index
            }
        };

        let devices = self.driver.devices(platform, options.gpu)?;
        ensure!(!devices.is_empty(), NoDevicesFoundSnafu { platform: Some(platform) });
        let device = options.device.unwrap_or(self.config.device);
        ensure!(device < devices.len(), InvalidDeviceIndexSnafu { index: device, count: devices.len() });

        let context = self.driver.open(platform, device, options.gpu)?;
        if let SessionState::Ready(previous) = &self.state {
            tracing::debug!(generation = previous.generation, "releasing previous device context");
        }

        self.generation += 1;
        let active = ActiveSession { context, platform, device, generation: self.generation };
        tracing::debug!(
            driver = self.driver.name(),
            device.name = %active.device_info().name,
            platform,
            device,
            generation = self.generation,
            "device session initialized"
        );
        self.state = SessionState::Ready(active.clone());
        Ok(active)
    }

    fn first_gpu_platform(&self, count: usize) -> Option<usize> {
        (0..count).find(|&platform| match self.driver.devices(platform, true) {
            Ok(devices) => !devices.is_empty(),
            Err(error) => {
                tracing::debug!(platform, %error, "skipping platform during GPU scan");
                false
            }
        })
    }

    /// Release the active context. Returns whether one was active.
    pub fn shutdown(&mut self) -> bool {
        match std::mem::replace(&mut self.state, SessionState::ShutDown) {
            SessionState::Ready(active) => {
                tracing::debug!(generation = active.generation, "device session shut down");
                true
            }
            previous => {
                self.state = previous;
                false
            }
        }
    }

    pub fn list_platforms(&self) -> Result<Vec<PlatformInfo>> {
        let platforms = self.driver.platforms()?;
        ensure!(!platforms.is_empty(), NoPlatformsFoundSnafu);
        Ok(platforms)
    }

    pub fn list_devices(&self, platform: usize, gpu_only: bool) -> Result<Vec<DeviceInfo>> {
        let count = self.list_platforms()?.len();
        ensure!(platform < count, InvalidPlatformIndexSnafu { index: platform, count });
        self.driver.devices(platform, gpu_only)
    }

    /// Info of the active device, `None` when no context is open.
    pub fn current_device_info(&self) -> Option<DeviceInfo> {
        self.active().map(|active| active.device_info().clone())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("driver", &self.driver.name())
            .field("config", &self.config)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}
