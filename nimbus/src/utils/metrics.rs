#[cfg(feature = "metrics")]
use std::time::{Duration, Instant};

/// Runs `f`, logging how long it took when the `metrics` feature is enabled.
pub fn metric<T>(label: &str, f: impl FnOnce() -> T) -> T {
    #[cfg(feature = "metrics")]
    {
        let (val, tt) = measure(f);

        log::debug!("{}: {}", label, humantime::format_duration(tt));

        val
    }

    #[cfg(not(feature = "metrics"))]
    {
        let _ = label;

        f()
    }
}

#[cfg(feature = "metrics")]
fn measure<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let tt = Instant::now();
    let val = f();

    (val, tt.elapsed())
}
