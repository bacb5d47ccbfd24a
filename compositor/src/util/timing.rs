use std::borrow::Cow;
use std::time::Instant;

use log::{self, Level};

/// Logs how long a scope took when dropped. Nothing is measured when the
/// level is disabled.
pub struct ScopedTimer {
    label: Option<Cow<'static, str>>,
    level: Level,
    start: Instant,
}

impl ScopedTimer {
    pub fn with_level(label: impl Into<Cow<'static, str>>, level: Level) -> Self {
        let label = log::log_enabled!(level).then(|| label.into());
        Self {
            label,
            level,
            start: Instant::now(),
        }
    }

    pub fn debug(label: impl Into<Cow<'static, str>>) -> Self {
        Self::with_level(label, Level::Debug)
    }

    pub fn trace(label: impl Into<Cow<'static, str>>) -> Self {
        Self::with_level(label, Level::Trace)
    }

    /// Like `trace`, but only builds the label when trace logging is on.
    pub fn trace_lazy<F>(label_gen: F) -> Self
    where
        F: FnOnce() -> String,
    {
        let label = log::log_enabled!(Level::Trace).then(|| Cow::Owned(label_gen()));
        Self {
            label,
            level: Level::Trace,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if let Some(label) = &self.label {
            let micros = self.start.elapsed().as_micros();
            log::log!(
                self.level,
                "{} took {}.{:03} ms",
                label,
                micros / 1000,
                micros % 1000
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No logger is installed in unit tests, so every level is disabled.

    #[test]
    fn test_disabled_level_keeps_no_label() {
        assert!(ScopedTimer::debug("Evaluating").label.is_none());
        assert!(ScopedTimer::trace(String::from("Executing")).label.is_none());
    }

    #[test]
    fn test_lazy_label_is_not_built_when_disabled() {
        let mut built = false;
        {
            let _timer = ScopedTimer::trace_lazy(|| {
                built = true;
                "Executing".to_string()
            });
        }
        assert!(!built);
    }
}
