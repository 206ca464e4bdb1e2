//! Log plumbing shared by the worklet build and native hosts.
//!
//! The library only talks to the `log` facade. Native binaries install
//! `env_logger`; the WebAssembly build installs `ConsoleLogger`, which forwards
//! records to the browser console.

/// Lets one record through every `every` calls. Used on the audio thread so a
/// failure that repeats every quantum does not flood the console.
#[derive(Debug, Clone)]
pub struct LogThrottle {
    every: u64,
    calls: u64,
}

/// Quanta between repeated log lines from the audio thread.
pub const DEFAULT_LOG_EVERY: u64 = 500;

impl LogThrottle {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            calls: 0,
        }
    }

    /// True on the first call and then once every `every` calls.
    pub fn ready(&mut self) -> bool {
        let ready = self.calls % self.every == 0;
        self.calls = self.calls.wrapping_add(1);
        ready
    }

    pub fn reset(&mut self) {
        self.calls = 0;
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_EVERY)
    }
}

#[cfg(feature = "wasm")]
mod console {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use web_sys::console;

    pub struct ConsoleLogger {
        level: LevelFilter,
    }

    static LOGGER: ConsoleLogger = ConsoleLogger {
        level: LevelFilter::Info,
    };

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= self.level
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let message = format!("[{}] {}", record.target(), record.args());
            match record.level() {
                Level::Error => console::error_1(&message.into()),
                Level::Warn => console::warn_1(&message.into()),
                _ => console::log_1(&message.into()),
            }
        }

        fn flush(&self) {}
    }

    /// Installs the console logger. Safe to call more than once.
    pub fn init_console_logging() {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LOGGER.level);
        }
    }
}

#[cfg(feature = "wasm")]
pub use console::{init_console_logging, ConsoleLogger};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_passes_first_then_every_nth() {
        let mut throttle = LogThrottle::new(3);
        let passed: Vec<bool> = (0..7).map(|_| throttle.ready()).collect();
        assert_eq!(passed, vec![true, false, false, true, false, false, true]);

        throttle.reset();
        assert!(throttle.ready());
    }
}
