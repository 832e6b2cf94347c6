//! The logging session: routes open and close, parameters accumulate, and the whole
//! thing is persisted exactly once.
//!
//! ## Lifecycle
//!
//! Every route name goes **absent → open → closed** and is never reusable. The session goes
//! **active → finalized**. Closing the last open route *drains* the session; a drained session
//! is finalized by [`Logpose::save`], by [`Logpose::close_route`] with no name and nothing open,
//! or when it is dropped. Opening another route while drained simply continues the session,
//! so sequential routes (`load`, then `train`) end up in the same record.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;

use crate::clock::Clock;
use crate::config::LogposeConfig;
use crate::error::{LogposeError, Result};
use crate::params::{ParameterBag, Parameters};
use crate::record::{DESCRIPTION_KEY, Record, RecordKey, SessionSummary, TIME_KEY};
use crate::reporter::{Reporter, SilentReporter, StdoutReporter};
use crate::route::{Route, RouteOptions};
use crate::store::{JsonDirStore, RecordStore, validate_session_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogposeOptions {
    /// Keep the API surface but skip timing, printing and persistence.
    pub debug: bool,
    pub verbose: bool,
}

impl Default for LogposeOptions {
    fn default() -> Self {
        Self {
            debug: false,
            verbose: true,
        }
    }
}

impl From<&LogposeConfig> for LogposeOptions {
    fn from(config: &LogposeConfig) -> Self {
        Self {
            debug: config.debug,
            verbose: config.verbose,
        }
    }
}

pub struct Logpose {
    name: String,
    description: String,
    options: LogposeOptions,
    clock: Option<Clock>,
    routes: IndexMap<String, Route>,
    /// Open route names, most recent last.
    open: Vec<String>,
    parameters: IndexMap<String, ParameterBag>,
    total_elapsed: Option<f64>,
    saved: bool,
    saved_key: Option<RecordKey>,
    store: Arc<dyn RecordStore>,
    reporter: Arc<dyn Reporter>,
}

impl Logpose {
    /// Session writing JSON records under `config.root`, printing to stdout when verbose.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        config: &LogposeConfig,
    ) -> Result<Self> {
        let reporter: Arc<dyn Reporter> = if config.verbose && !config.debug {
            Arc::new(StdoutReporter)
        } else {
            Arc::new(SilentReporter)
        };
        Self::with_store(
            name,
            description,
            LogposeOptions::from(config),
            Arc::new(JsonDirStore::new(config.root.clone())),
            reporter,
        )
    }

    pub fn with_store(
        name: impl Into<String>,
        description: impl Into<String>,
        options: LogposeOptions,
        store: Arc<dyn RecordStore>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let name = name.into();
        validate_session_name(&name)?;
        Ok(Self {
            name,
            description: description.into(),
            options,
            clock: (!options.debug).then(Clock::start),
            routes: IndexMap::new(),
            open: Vec::new(),
            parameters: IndexMap::new(),
            total_elapsed: None,
            saved: false,
            saved_key: None,
            store,
            reporter,
        })
    }

    fn ensure_active(&self) -> Result<()> {
        if self.saved {
            return Err(LogposeError::AlreadySaved {
                session: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Opens a route and starts its clock. Names are single-use, even after the route closes.
    pub fn add_route(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<()> {
        self.ensure_active()?;
        let name = name.into();
        if self.routes.contains_key(&name) {
            return Err(LogposeError::DuplicateName { name });
        }
        let description = description.into();
        let options = RouteOptions {
            timing: !self.options.debug,
            verbose: self.options.verbose && !self.options.debug,
        };
        if options.verbose {
            self.reporter.line("");
            self.reporter.line(&name);
        }
        let route = Route::open(description.clone(), options, self.reporter.as_ref());
        tracing::debug!(logpose = %self.name, route = %name, "route opened");

        let mut bag = ParameterBag::new();
        bag.insert(DESCRIPTION_KEY.to_string(), Value::String(description));
        self.parameters.insert(name.clone(), bag);
        self.routes.insert(name.clone(), route);
        self.open.push(name);
        Ok(())
    }

    /// Merges parameters into an open route's bag, overwriting existing names.
    pub fn add_parameters(&mut self, name: &str, parameters: impl Into<Parameters>) -> Result<()> {
        self.ensure_active()?;
        if !self.open.iter().any(|n| n == name) {
            return Err(LogposeError::UnknownRoute { name: name.to_string() });
        }
        let parameters = parameters.into();
        tracing::debug!(
            logpose = %self.name,
            route = name,
            count = parameters.len(),
            "parameters added"
        );
        let bag = self
            .parameters
            .get_mut(name)
            .ok_or_else(|| LogposeError::UnknownRoute { name: name.to_string() })?;
        parameters.merge_into(bag);
        Ok(())
    }

    /// Like [`Logpose::add_parameters`], for parameters that arrive as untyped JSON:
    /// an object, or a `[name, value]` pair.
    pub fn add_parameters_json(&mut self, name: &str, parameters: Value) -> Result<()> {
        let parameters = Parameters::try_from(parameters)?;
        self.add_parameters(name, parameters)
    }

    /// Closes `name`, or the most recently opened route when `None`.
    ///
    /// With `None` and nothing open this finalizes the session, with the same errors as
    /// [`Logpose::save`].
    pub fn close_route(&mut self, name: Option<&str>) -> Result<()> {
        self.ensure_active()?;
        match name {
            Some(name) => {
                let Some(position) = self.open.iter().position(|n| n == name) else {
                    return Err(LogposeError::UnknownOpenRoute { name: name.to_string() });
                };
                self.close_at(position)
            }
            None => match self.open.len().checked_sub(1) {
                Some(last) => self.close_at(last),
                None => self.save().map(|_| ()),
            },
        }
    }

    /// Closes and benchmarks the named route.
    pub fn bench_it(&mut self, name: &str) -> Result<()> {
        self.close_route(Some(name))
    }

    fn close_at(&mut self, position: usize) -> Result<()> {
        let name = self.open[position].clone();
        let route = self
            .routes
            .get_mut(&name)
            .ok_or_else(|| LogposeError::UnknownOpenRoute { name: name.clone() })?;
        let elapsed = route.close(&name, self.reporter.as_ref())?;
        self.open.remove(position);
        if let (Some(elapsed), Some(bag)) = (elapsed, self.parameters.get_mut(&name)) {
            bag.insert(TIME_KEY.to_string(), Value::from(elapsed.as_secs_f64()));
        }
        tracing::debug!(
            logpose = %self.name,
            route = %name,
            seconds = elapsed.map(|d| d.as_secs_f64()),
            "route closed"
        );
        if self.open.is_empty() {
            tracing::debug!(logpose = %self.name, "all routes closed");
        }
        Ok(())
    }

    /// Sum of every recorded route `time`, in seconds.
    fn summed_time(&self) -> f64 {
        self.parameters
            .values()
            .filter_map(|bag| bag.get(TIME_KEY).and_then(Value::as_f64))
            .sum()
    }

    /// Persists the record. Returns the storage key, or `None` in debug mode.
    ///
    /// A failed write leaves the session unsaved so the call can be retried.
    pub fn save(&mut self) -> Result<Option<RecordKey>> {
        self.ensure_active()?;
        if !self.open.is_empty() {
            return Err(LogposeError::OpenRoutes {
                open: self.open.clone(),
            });
        }
        if self.parameters.is_empty() {
            return Err(LogposeError::EmptySession);
        }
        let total = self.summed_time();
        if self.options.debug {
            self.total_elapsed = Some(total);
            self.saved = true;
            tracing::debug!(logpose = %self.name, "debug logpose finalized without writing");
            return Ok(None);
        }

        let key = self.store.write(&self.name, &self.record())?;
        let wall_seconds = self.clock.as_mut().map(|c| c.elapsed().as_secs_f64());
        self.total_elapsed = Some(total);
        self.saved = true;
        self.saved_key = Some(key.clone());
        tracing::info!(
            logpose = %self.name,
            key = %key,
            routes = self.routes.len(),
            seconds = total,
            wall_seconds,
            "logpose saved"
        );
        Ok(Some(key))
    }

    /// Snapshot of the document that [`Logpose::save`] writes.
    pub fn record(&self) -> Record {
        Record {
            session: SessionSummary {
                name: self.name.clone(),
                description: self.description.clone(),
                time: self.total_elapsed.unwrap_or_else(|| self.summed_time()),
            },
            routes: self.parameters.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> LogposeOptions {
        self.options
    }

    /// Open route names, most recently opened last.
    pub fn open_routes(&self) -> &[String] {
        &self.open
    }

    pub fn route(&self, name: &str) -> Option<&Route> {
        self.routes.get(name)
    }

    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn parameters(&self, name: &str) -> Option<&ParameterBag> {
        self.parameters.get(name)
    }

    /// Total seconds, set once the session is saved.
    pub fn total_elapsed(&self) -> Option<f64> {
        self.total_elapsed
    }

    /// Wall-clock time since the session was created. `None` in debug mode.
    pub fn wall_elapsed(&mut self) -> Option<Duration> {
        self.clock.as_mut().map(Clock::elapsed)
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn saved_key(&self) -> Option<&RecordKey> {
        self.saved_key.as_ref()
    }

    /// Every route has been closed but the session has not been saved yet.
    pub fn is_drained(&self) -> bool {
        !self.saved && self.open.is_empty() && !self.routes.is_empty()
    }
}

impl Drop for Logpose {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if !self.saved {
                tracing::warn!(logpose = %self.name, "dropped during a panic; nothing saved");
            }
            return;
        }
        if self.is_drained() {
            if let Err(e) = self.save() {
                tracing::warn!(logpose = %self.name, error = %e, "failed to save logpose on drop");
            }
        } else if !self.saved && !self.open.is_empty() {
            tracing::warn!(
                logpose = %self.name,
                open = ?self.open,
                "logpose dropped with open routes; nothing saved"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::reporter::testing::CapturingReporter;
    use crate::store::testing::MemoryStore;

    fn session(store: &Arc<MemoryStore>) -> Logpose {
        Logpose::with_store(
            "Exp1",
            "first test",
            LogposeOptions::default(),
            store.clone(),
            Arc::new(SilentReporter),
        )
        .unwrap()
    }

    #[test]
    fn sequential_routes_end_up_in_one_record() {
        let store = Arc::new(MemoryStore::default());
        let mut lp = session(&store);
        lp.add_route("load", "loading data").unwrap();
        lp.bench_it("load").unwrap();
        assert!(lp.is_drained());
        lp.add_route("train", "training model").unwrap();
        assert!(!lp.is_drained());
        lp.bench_it("train").unwrap();
        let key = lp.save().unwrap();
        assert!(key.is_some());
        assert!(lp.is_saved());

        let record = store.only();
        assert_eq!(record.session.name, "Exp1");
        assert_eq!(record.session.description, "first test");
        assert_eq!(record.route_names().collect::<Vec<_>>(), ["load", "train"]);
        assert_eq!(record.routes["load"]["description"], json!("loading data"));
    }

    #[test]
    fn drop_finalizes_a_drained_session_once() {
        let store = Arc::new(MemoryStore::default());
        {
            let mut lp = session(&store);
            lp.add_route("load", "loading data").unwrap();
            lp.close_route(None).unwrap();
        }
        assert_eq!(store.len(), 1);

        {
            let mut lp = session(&store);
            lp.add_route("load", "loading data").unwrap();
            lp.close_route(None).unwrap();
            lp.save().unwrap();
        }
        assert_eq!(store.len(), 2, "explicit save must not be repeated on drop");
    }

    #[test]
    fn drop_with_open_routes_saves_nothing() {
        let store = Arc::new(MemoryStore::default());
        {
            let mut lp = session(&store);
            lp.add_route("load", "loading data").unwrap();
        }
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn drop_during_panic_does_not_persist_partial_run() {
        let store = Arc::new(MemoryStore::default());
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut lp = session(&store);
            lp.add_route("load", "loading data").unwrap();
            lp.bench_it("load").unwrap();
            assert!(lp.is_drained());
            panic!("training crashed before its route opened");
        }));
        assert!(outcome.is_err());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn unnamed_close_pops_most_recent_then_finalizes() {
        let store = Arc::new(MemoryStore::default());
        let mut lp = session(&store);
        lp.add_route("outer", "outer block").unwrap();
        lp.add_route("inner", "inner block").unwrap();
        lp.close_route(None).unwrap();
        assert_eq!(lp.open_routes(), ["outer"]);
        assert!(!lp.route("inner").unwrap().is_open());
        lp.close_route(None).unwrap();
        assert!(lp.open_routes().is_empty());
        assert!(!lp.is_saved());
        lp.close_route(None).unwrap();
        assert!(lp.is_saved());
        assert_eq!(store.len(), 1);

        let err = lp.close_route(None).unwrap_err();
        assert!(matches!(err, LogposeError::AlreadySaved { .. }));
    }

    #[test]
    fn names_are_single_use() {
        let store = Arc::new(MemoryStore::default());
        let mut lp = session(&store);
        lp.add_route("load", "loading data").unwrap();
        let err = lp.add_route("load", "again").unwrap_err();
        assert!(matches!(err, LogposeError::DuplicateName { ref name } if name == "load"));
        lp.bench_it("load").unwrap();
        let err = lp.add_route("load", "after close").unwrap_err();
        assert!(matches!(err, LogposeError::DuplicateName { .. }));
    }

    #[test]
    fn closing_unknown_or_closed_route_fails() {
        let store = Arc::new(MemoryStore::default());
        let mut lp = session(&store);
        let err = lp.bench_it("ghost").unwrap_err();
        assert!(matches!(err, LogposeError::UnknownOpenRoute { ref name } if name == "ghost"));
        lp.add_route("load", "loading data").unwrap();
        lp.bench_it("load").unwrap();
        let err = lp.bench_it("load").unwrap_err();
        assert!(matches!(err, LogposeError::UnknownOpenRoute { .. }));
    }

    #[test]
    fn parameters_only_attach_to_open_routes() {
        let store = Arc::new(MemoryStore::default());
        let mut lp = session(&store);
        assert!(matches!(
            lp.add_parameters("load", ("rows", 10)).unwrap_err(),
            LogposeError::UnknownRoute { .. }
        ));
        lp.add_route("load", "loading data").unwrap();
        lp.add_parameters("load", ("rows", 10)).unwrap();
        lp.add_parameters_json("load", json!({"rows": 12, "source": "s3"})).unwrap();
        lp.add_parameters_json("load", json!(["shuffle", true])).unwrap();
        let err = lp.add_parameters_json("load", json!(5)).unwrap_err();
        assert!(matches!(err, LogposeError::InvalidParameterShape(_)));

        let bag = lp.parameters("load").unwrap();
        assert_eq!(bag["rows"], json!(12));
        assert_eq!(bag["source"], json!("s3"));
        assert_eq!(bag["shuffle"], json!(true));

        lp.bench_it("load").unwrap();
        let err = lp.add_parameters("load", ("late", 1)).unwrap_err();
        assert!(matches!(err, LogposeError::UnknownRoute { .. }));
    }

    #[test]
    fn total_is_sum_of_route_times() {
        let store = Arc::new(MemoryStore::default());
        let mut lp = session(&store);
        for name in ["a", "b", "c"] {
            lp.add_route(name, "work").unwrap();
            std::thread::sleep(Duration::from_millis(2));
            lp.bench_it(name).unwrap();
        }
        lp.save().unwrap();
        let record = store.only();
        let sum: f64 = ["a", "b", "c"].iter().map(|n| record.route_time(n).unwrap()).sum();
        let total = lp.total_elapsed().unwrap();
        assert!((total - sum).abs() < 1e-9);
        assert!((record.session.time - sum).abs() < 1e-9);
        assert!(record.route_time("a").unwrap() >= 0.002);
    }

    #[test]
    fn save_guards() {
        let store = Arc::new(MemoryStore::default());
        let mut lp = session(&store);
        assert!(matches!(lp.save().unwrap_err(), LogposeError::EmptySession));
        lp.add_route("load", "loading data").unwrap();
        match lp.save().unwrap_err() {
            LogposeError::OpenRoutes { open } => assert_eq!(open, ["load"]),
            other => panic!("expected OpenRoutes, got {other:?}"),
        }
        lp.bench_it("load").unwrap();
        lp.save().unwrap();
        assert!(matches!(lp.save().unwrap_err(), LogposeError::AlreadySaved { .. }));
        assert!(matches!(
            lp.add_route("more", "x").unwrap_err(),
            LogposeError::AlreadySaved { .. }
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn failed_write_can_be_retried() {
        let store = Arc::new(MemoryStore::default());
        let mut lp = session(&store);
        lp.add_route("load", "loading data").unwrap();
        lp.bench_it("load").unwrap();
        store.fail_writes(true);
        assert!(matches!(lp.save().unwrap_err(), LogposeError::Storage { .. }));
        assert!(!lp.is_saved());
        assert!(lp.total_elapsed().is_none());
        store.fail_writes(false);
        assert!(lp.save().unwrap().is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn debug_session_tracks_but_never_writes() {
        let store = Arc::new(MemoryStore::default());
        let reporter = Arc::new(CapturingReporter::default());
        let mut lp = Logpose::with_store(
            "Exp1",
            "debugging",
            LogposeOptions {
                debug: true,
                verbose: true,
            },
            store.clone(),
            reporter.clone(),
        )
        .unwrap();
        lp.add_route("load", "loading data").unwrap();
        assert!(lp.add_route("load", "dup").is_err());
        lp.add_parameters("load", ("rows", 3)).unwrap();
        lp.bench_it("load").unwrap();
        assert!(lp.parameters("load").unwrap().get("time").is_none());
        assert_eq!(lp.save().unwrap(), None);
        assert!(lp.is_saved());
        assert!(matches!(lp.save().unwrap_err(), LogposeError::AlreadySaved { .. }));
        assert_eq!(store.len(), 0);
        assert!(reporter.lines().is_empty());
        assert!(lp.wall_elapsed().is_none());
    }

    #[test]
    fn verbose_session_reports_route_progress() {
        let store = Arc::new(MemoryStore::default());
        let reporter = Arc::new(CapturingReporter::default());
        let mut lp = Logpose::with_store(
            "Exp1",
            "first test",
            LogposeOptions::default(),
            store,
            reporter.clone(),
        )
        .unwrap();
        lp.add_route("load", "loading data").unwrap();
        lp.bench_it("load").unwrap();
        assert!(reporter.contains("load"));
        assert!(reporter.contains("loading data..."));
        assert!(reporter.contains("OK!"));
        assert!(reporter.contains("Run in: "));
    }

    #[test]
    fn invalid_session_name_is_rejected() {
        let store = Arc::new(MemoryStore::default());
        let result = Logpose::with_store(
            "../escape",
            "x",
            LogposeOptions::default(),
            store,
            Arc::new(SilentReporter),
        );
        assert!(matches!(result, Err(LogposeError::InvalidName { .. })));
    }

    #[test]
    fn new_writes_under_config_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogposeConfig::new(dir.path()).verbose(false);
        let mut lp = Logpose::new("Exp1", "first test", &config).unwrap();
        lp.add_route("load", "loading data").unwrap();
        lp.bench_it("load").unwrap();
        let key = lp.save().unwrap().unwrap();
        let path = dir.path().join("Exp1").join(format!("{key}.json"));
        assert!(path.is_file(), "missing {}", path.display());
        assert_eq!(lp.saved_key(), Some(&key));
    }
}
