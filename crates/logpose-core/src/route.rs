use std::time::Duration;

use crate::clock::Clock;
use crate::error::{LogposeError, Result};
use crate::reporter::Reporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOptions {
    /// Start a clock when the route opens.
    pub timing: bool,
    /// Report the route banner and timing.
    pub verbose: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            timing: true,
            verbose: true,
        }
    }
}

/// One timed, described unit of work inside a logpose.
#[derive(Debug, Clone)]
pub struct Route {
    description: String,
    status: RouteStatus,
    clock: Option<Clock>,
    elapsed: Option<Duration>,
    verbose: bool,
}

impl Route {
    pub fn open(
        description: impl Into<String>,
        options: RouteOptions,
        reporter: &dyn Reporter,
    ) -> Self {
        let description = description.into();
        if options.verbose {
            reporter.banner(&format!("{description}..."));
        }
        Self {
            description,
            status: RouteStatus::Open,
            clock: options.timing.then(Clock::start),
            elapsed: None,
            verbose: options.verbose,
        }
    }

    /// Closes the route. Returns `None` when timing was disabled.
    pub fn close(&mut self, name: &str, reporter: &dyn Reporter) -> Result<Option<Duration>> {
        if self.status == RouteStatus::Closed {
            return Err(LogposeError::AlreadyClosed { name: name.to_string() });
        }
        if self.verbose {
            reporter.line("OK!");
        }
        self.elapsed = match (&mut self.clock, self.verbose) {
            (Some(clock), true) => Some(clock.elapsed_reported(reporter)),
            (Some(clock), false) => Some(clock.elapsed()),
            (None, _) => None,
        };
        self.status = RouteStatus::Closed;
        Ok(self.elapsed)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> RouteStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == RouteStatus::Open
    }

    /// Duration measured at close; `None` while open or when untimed.
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }
}
