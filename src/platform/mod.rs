//! Foreground application lookup

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::X11Source;

use crate::types::{AppId, Result};
use std::sync::Arc;

/// Source of the currently focused application
pub trait ForegroundSource: Send + Sync {
    /// Source name for logging (e.g., "x11")
    fn name(&self) -> &str;

    /// Identify the focused application. `Ok(None)` means nothing is focused.
    fn foreground_app(&self) -> Result<Option<AppId>>;

    /// Like [`foreground_app`](Self::foreground_app), with failures mapped to `None`.
    fn sample_foreground_app(&self) -> Option<AppId> {
        match self.foreground_app() {
            Ok(app) => app,
            Err(e) => {
                log::debug!("{} lookup failed: {}", self.name(), e);
                None
            }
        }
    }
}

/// Source that never observes an application
pub struct NullSource;

impl ForegroundSource for NullSource {
    fn name(&self) -> &str {
        "null"
    }

    fn foreground_app(&self) -> Result<Option<AppId>> {
        Ok(None)
    }
}

/// Best source available on this system
pub fn native_source() -> Arc<dyn ForegroundSource> {
    #[cfg(target_os = "linux")]
    {
        match X11Source::connect() {
            Ok(source) => return Arc::new(source),
            Err(e) => log::warn!("X11 unavailable, no apps will be observed: {}", e),
        }
    }

    #[cfg(not(target_os = "linux"))]
    log::warn!("no foreground lookup for this platform, no apps will be observed");

    Arc::new(NullSource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScreentrackError;

    struct FailingSource;

    impl ForegroundSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        fn foreground_app(&self) -> Result<Option<AppId>> {
            Err(ScreentrackError::Platform("permission denied".into()))
        }
    }

    #[test]
    fn test_sample_maps_error_to_none() {
        assert_eq!(FailingSource.sample_foreground_app(), None);
    }

    #[test]
    fn test_null_source_observes_nothing() {
        assert_eq!(NullSource.sample_foreground_app(), None);
    }
}
