//! Serializer options.

use tracing::warn;

/// Knobs for a [`Serializer`](super::Serializer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Track the objects currently being written and fail with
    /// [`Error::CycleDetected`](crate::Error::CycleDetected) when one is
    /// reached again through its own members. Off by default: shared
    /// subobjects are written once per reference either way.
    pub cycle_guard: bool,
}

impl SerializeOptions {
    /// Environment variable read by [`from_env`](Self::from_env).
    pub const ENV_CYCLE_GUARD: &'static str = "H5OBJECT_CYCLE_GUARD";

    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: enable or disable the cycle guard.
    pub fn with_cycle_guard(mut self, enabled: bool) -> Self {
        self.cycle_guard = enabled;
        self
    }

    /// Defaults overridden by `H5OBJECT_CYCLE_GUARD` (`1`/`true`/`on`).
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Ok(raw) = std::env::var(Self::ENV_CYCLE_GUARD) {
            match parse_flag(&raw) {
                Some(flag) => opts.cycle_guard = flag,
                None => warn!("ignoring {}={raw:?}: not a boolean", Self::ENV_CYCLE_GUARD),
            }
        }
        opts
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
