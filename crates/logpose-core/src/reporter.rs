//! Human-facing progress output (route banners, "OK!", run times).
//! Pass your reporter when building a session: `Logpose::with_store(.., Arc::new(your_reporter))`.

use std::io::Write as _;

const RULE: &str = "-------------------------------------------";

/// Progress output abstraction.
/// Implement and pass to [`Logpose::with_store`](crate::Logpose::with_store).
pub trait Reporter: Send + Sync {
    fn line(&self, message: &str);

    /// Message framed by horizontal rules.
    fn banner(&self, message: &str) {
        self.line("");
        self.line(RULE);
        self.line(message);
        self.line(RULE);
    }
}

/// Default implementation writing to stdout.
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn line(&self, message: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{message}");
    }
}

/// Discards everything. Used for non-verbose and debug sessions.
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn line(&self, _message: &str) {}

    fn banner(&self, _message: &str) {}
}
