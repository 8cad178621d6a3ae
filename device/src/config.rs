//! Session configuration.
//!
//! Default platform and device indices come from the environment; explicit
//! [`InitOptions`] override them per initialization.

use bon::bon;

/// Default platform index variable.
pub const PLATFORM_VAR: &str = "MG_CL_DEFAULT_PLATFORM";
/// Default device index variable.
pub const DEVICE_VAR: &str = "MG_CL_DEFAULT_DEVICE";

/// Default device selection used by lazy initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub platform: usize,
    pub device: usize,
}

impl SessionConfig {
    /// Read defaults from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `MG_CL_DEFAULT_PLATFORM` - Platform index (default: 0)
    /// * `MG_CL_DEFAULT_DEVICE` - Device index on that platform (default: 0)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self { platform: index_var(PLATFORM_VAR, &lookup), device: index_var(DEVICE_VAR, &lookup) }
    }
}

fn index_var(name: &str, lookup: &impl Fn(&str) -> Option<String>) -> usize {
    let Some(value) = lookup(name) else {
        return 0;
    };
    match value.trim().parse() {
        Ok(index) => index,
        Err(_) => {
            tracing::warn!(var = name, value = %value, "ignoring unparseable device index");
            0
        }
    }
}

/// Explicit device selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitOptions {
    /// Platform index, [`SessionConfig::platform`] when unset.
    pub platform: Option<usize>,
    /// Device index, [`SessionConfig::device`] when unset.
    pub device: Option<usize>,
    /// Restrict selection to GPU devices. Without an explicit platform, the
    /// first platform exposing a GPU is used.
    pub gpu: bool,
}

#[bon]
impl InitOptions {
    #[builder]
    pub fn new(platform: Option<usize>, device: Option<usize>, #[builder(default = false)] gpu: bool) -> Self {
        Self { platform, device, gpu }
    }
}
