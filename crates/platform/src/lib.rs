//! Platform identity provider.
//! Exposes the platform the process is running on and a selection primitive
//! for picking a per-platform value. Do NOT put feature logic here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable that overrides the detected platform.
pub const PLATFORM_OVERRIDE_ENV: &str = "PLATFORM_INFO_OS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("Unknown platform identifier: {0}")]
    UnknownPlatform(String),

    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Execution targets an application can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Macos,
    Windows,
    Linux,
    Web,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Ios,
        Platform::Android,
        Platform::Macos,
        Platform::Windows,
        Platform::Linux,
        Platform::Web,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Web => "web",
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, Platform::Ios | Platform::Android)
    }

    pub fn is_desktop(&self) -> bool {
        matches!(self, Platform::Macos | Platform::Windows | Platform::Linux)
    }

    /// Platform the binary was compiled for.
    pub fn compiled() -> Result<Self> {
        if cfg!(target_family = "wasm") {
            return Ok(Platform::Web);
        }

        match std::env::consts::OS {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "macos" => Ok(Platform::Macos),
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            other => Err(PlatformError::UnsupportedOs(other.to_string())),
        }
    }

    /// Detect the running platform, honoring `PLATFORM_INFO_OS` when set.
    pub fn detect() -> Result<Self> {
        match std::env::var(PLATFORM_OVERRIDE_ENV) {
            Ok(value) if !value.trim().is_empty() => {
                let platform = value.parse()?;
                debug!("Platform overridden via {}: {}", PLATFORM_OVERRIDE_ENV, platform);
                Ok(platform)
            }
            _ => Self::compiled(),
        }
    }

    /// Detected platform, resolved once per process. An invalid override
    /// falls back to the compiled platform.
    pub fn current() -> Result<Self> {
        static CURRENT: OnceLock<Result<Platform>> = OnceLock::new();
        CURRENT
            .get_or_init(|| {
                let detected = Self::detect().or_else(|e| {
                    warn!("Ignoring {}: {}", PLATFORM_OVERRIDE_ENV, e);
                    Self::compiled()
                });
                if let Ok(platform) = &detected {
                    info!("Running on platform: {}", platform);
                }
                detected
            })
            .clone()
    }

    pub fn is_any_of(&self, platforms: &[Platform]) -> bool {
        platforms.contains(self)
    }

    /// Pick the entry registered for this platform, or `default` when none
    /// matches. Later entries for the same platform win.
    pub fn select<V, I>(&self, entries: I, default: Option<V>) -> Option<V>
    where
        I: IntoIterator<Item = (Platform, V)>,
    {
        entries
            .into_iter()
            .filter(|(platform, _)| platform == self)
            .last()
            .map(|(_, value)| value)
            .or(default)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        Platform::ALL
            .into_iter()
            .find(|platform| platform.name() == normalized)
            .ok_or_else(|| PlatformError::UnknownPlatform(s.to_string()))
    }
}
