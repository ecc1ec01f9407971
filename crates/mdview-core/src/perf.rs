//! Timing for file reads and renders.

/// High-resolution timestamp in milliseconds, from an arbitrary origin.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub fn now() -> f64 {
    use std::sync::OnceLock;
    use web_time::Instant;

    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    ORIGIN.get_or_init(Instant::now).elapsed().as_secs_f64() * 1000.0
}

/// Logs the time between its creation and `finish` (or drop).
///
/// Works across await points, which a closure-based timer can't.
#[derive(Debug)]
pub struct Stopwatch {
    label: &'static str,
    start: f64,
    done: bool,
}

impl Stopwatch {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: now(),
            done: false,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        now() - self.start
    }

    pub fn finish(mut self) -> f64 {
        self.done = true;
        let elapsed = self.elapsed_ms();
        tracing::debug!(elapsed_ms = elapsed, "{}", self.label);
        elapsed
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        if !self.done {
            tracing::debug!(elapsed_ms = self.elapsed_ms(), "{} (abandoned)", self.label);
        }
    }
}
