use std::time::{Duration, Instant};

use crate::reporter::Reporter;

/// Monotonic stopwatch started at construction.
#[derive(Debug, Clone)]
pub struct Clock {
    start: Instant,
    last_elapsed: Option<Duration>,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            last_elapsed: None,
        }
    }

    /// Time since start. Also remembered as [`Clock::last_elapsed`].
    pub fn elapsed(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        self.last_elapsed = Some(elapsed);
        elapsed
    }

    /// Same as [`Clock::elapsed`], and reports `Run in: ...` through `reporter`.
    pub fn elapsed_reported(&mut self, reporter: &dyn Reporter) -> Duration {
        let elapsed = self.elapsed();
        reporter.banner(&format!("Run in: {}", format_elapsed(elapsed)));
        elapsed
    }

    pub fn last_elapsed(&self) -> Option<Duration> {
        self.last_elapsed
    }
}

/// Seconds below a minute, `m s` below an hour, `h m s` above.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64();
    if total < 60.0 {
        return format!("{total:.3} s");
    }
    let whole = elapsed.as_secs();
    let fraction = total - whole as f64;
    let seconds = (whole % 60) as f64 + fraction;
    if total < 3600.0 {
        return format!("{} m {seconds:.3} s", whole / 60);
    }
    format!("{} h {} m {seconds:.3} s", whole / 3600, (whole % 3600) / 60)
}
