/// Destination for encoder warnings.
///
/// Injected into the writer so callers (and tests) decide where warnings go
/// instead of relying on a process-wide logger.
pub trait WarnSink {
    /// Whether a warning would be recorded. Checked before formatting the message.
    fn enabled(&self) -> bool {
        true
    }

    fn warn(&self, message: &str);
}

impl<T: WarnSink + ?Sized> WarnSink for &T {
    fn enabled(&self) -> bool {
        (**self).enabled()
    }

    fn warn(&self, message: &str) {
        (**self).warn(message)
    }
}

/// Forwards warnings to `tracing` at WARN level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingWarnSink;

impl WarnSink for TracingWarnSink {
    fn enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::WARN)
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}
