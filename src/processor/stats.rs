/// Running counters for one processor. Plain integers, updated only from the
/// audio thread.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Callbacks seen, active or not.
    pub quanta: u64,
    /// Blocks handed to the estimator successfully.
    pub analyses: u64,
    /// Blocks with no voiced frame; nothing is sent for these.
    pub unvoiced: u64,
    /// Values accepted by the relay.
    pub relayed: u64,
    /// Values dropped because the relay was full.
    pub dropped: u64,
    /// Values produced before any relay was bound.
    pub unbound: u64,
    /// Quanta whose analysis failed and were silenced.
    pub failures: u64,
    /// Buffer reallocations caused by a channel-count change.
    pub resizes: u64,
}

/// Share of real time spent inside `process`, averaged over windows of at
/// least 100 ms of audio.
#[derive(Debug, Clone)]
pub struct CpuLoad {
    cpu_time_accum: f64,
    audio_time_accum: f64,
    last_usage: f32,
}

const LOAD_WINDOW_SECONDS: f64 = 0.1;

impl CpuLoad {
    pub fn new() -> Self {
        Self {
            cpu_time_accum: 0.0,
            audio_time_accum: 0.0,
            last_usage: 0.0,
        }
    }

    /// Adds one quantum: `elapsed` seconds of work for `audio` seconds of sound.
    pub fn record(&mut self, elapsed: f64, audio: f64) {
        self.cpu_time_accum += elapsed;
        self.audio_time_accum += audio;
        if self.audio_time_accum >= LOAD_WINDOW_SECONDS {
            self.last_usage = ((self.cpu_time_accum / self.audio_time_accum) * 100.0) as f32;
            self.cpu_time_accum = 0.0;
            self.audio_time_accum = 0.0;
        }
    }

    /// Percentage of the last complete window.
    pub fn usage(&self) -> f32 {
        self.last_usage
    }
}

impl Default for CpuLoad {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic seconds for load measurement, where the platform has a clock.
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub(crate) fn now_seconds() -> Option<f64> {
    Some(js_sys::Date::now() / 1000.0)
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn now_seconds() -> Option<f64> {
    use once_cell::sync::Lazy;
    use std::time::Instant;

    static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);
    Some(EPOCH.elapsed().as_secs_f64())
}

#[cfg(all(not(feature = "wasm"), target_arch = "wasm32"))]
pub(crate) fn now_seconds() -> Option<f64> {
    None
}
