//! Log fan-out shared by every handler in a pipeline.
//!
//! Each message is emitted as a `tracing` event and then handed to every
//! registered `LogSink`, so callers can capture client logs without
//! installing a global subscriber.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::Level;

/// Receives every message the pipeline logs.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

#[derive(Default)]
pub struct LogManager {
    sinks: RwLock<Vec<Arc<dyn LogSink>>>,
}

impl fmt::Debug for LogManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogManager")
            .field("sinks", &self.sinks.read().unwrap_or_else(PoisonError::into_inner).len())
            .finish()
    }
}

impl LogManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_logger(&self, sink: Arc<dyn LogSink>) {
        self.sinks.write().unwrap_or_else(PoisonError::into_inner).push(sink);
    }

    pub fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "contentstack_management", "{message}"),
            Level::WARN => tracing::warn!(target: "contentstack_management", "{message}"),
            Level::INFO => tracing::info!(target: "contentstack_management", "{message}"),
            Level::DEBUG => tracing::debug!(target: "contentstack_management", "{message}"),
            Level::TRACE => tracing::trace!(target: "contentstack_management", "{message}"),
        }
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        for sink in sinks.iter() {
            sink.log(level, message);
        }
    }

    pub fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }
}

/// Sink that keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RwLock<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_fan_out_to_every_sink() {
        let manager = LogManager::new();
        let first = Arc::new(MemorySink::default());
        let second = Arc::new(MemorySink::default());
        manager.add_logger(first.clone());
        manager.add_logger(second.clone());

        manager.warn("retrying");
        manager.error("gave up");

        for sink in [&first, &second] {
            assert_eq!(
                sink.entries(),
                vec![(Level::WARN, "retrying".to_string()), (Level::ERROR, "gave up".to_string())]
            );
        }
    }
}
