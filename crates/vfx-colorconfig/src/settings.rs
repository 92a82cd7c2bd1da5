//! Process-wide toggles that control engine usage.
//!
//! Two environment variables are read once, the first time
//! [`Settings::global`] is called:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `VFX_DISABLE_OCIO` | never consult the color engine |
//! | `VFX_DISABLE_BUILTIN_OCIO_CONFIGS` | skip builtin/reference config probing |
//!
//! Any value that parses as a non-zero integer enables the toggle.
//! Tests build [`Settings`] values directly and hand them to
//! [`ColorConfigBuilder::settings`](crate::ColorConfigBuilder::settings)
//! instead of touching the environment.

use std::env;
use std::sync::OnceLock;

/// Environment variable disabling the color engine entirely.
pub const ENV_DISABLE_ENGINE: &str = "VFX_DISABLE_OCIO";
/// Environment variable disabling builtin config probing.
pub const ENV_DISABLE_BUILTIN_CONFIGS: &str = "VFX_DISABLE_BUILTIN_OCIO_CONFIGS";
/// Environment variable naming the config to load by default.
pub const ENV_CONFIG: &str = "OCIO";

static GLOBAL: OnceLock<Settings> = OnceLock::new();

/// Immutable engine toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    /// Never consult the color engine; use name heuristics only.
    pub disable_engine: bool,
    /// Never probe builtin or reference configs for equivalences.
    pub disable_builtin_configs: bool,
}

impl Settings {
    /// Settings with every toggle off.
    pub const fn new() -> Self {
        Self {
            disable_engine: false,
            disable_builtin_configs: false,
        }
    }

    /// Settings that bypass the engine entirely.
    pub const fn engine_disabled() -> Self {
        Self {
            disable_engine: true,
            disable_builtin_configs: false,
        }
    }

    /// Reads the toggles from the environment.
    pub fn from_env() -> Self {
        Self {
            disable_engine: env_flag(ENV_DISABLE_ENGINE),
            disable_builtin_configs: env_flag(ENV_DISABLE_BUILTIN_CONFIGS),
        }
    }

    /// Process-wide settings, read from the environment on first use.
    pub fn global() -> &'static Settings {
        GLOBAL.get_or_init(Self::from_env)
    }

    /// True when builtin probing may run (engine on, probing on).
    #[inline]
    pub fn builtin_probing(&self) -> bool {
        !self.disable_engine && !self.disable_builtin_configs
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .is_some_and(|v| v != 0)
}
