//! Structured run logging.
//!
//! A [`Logpose`] is a named logging session split into timed [`Route`]s. Each route carries a
//! description, its elapsed time and any parameters attached while it was open. The finished
//! session is written once as a timestamped [`Record`] through a [`RecordStore`].
//!
//! ```no_run
//! use logpose_core::{Logpose, LogposeConfig};
//!
//! # fn main() -> Result<(), logpose_core::LogposeError> {
//! let config = LogposeConfig::from_env();
//! let mut lp = Logpose::new("Exp1", "first test", &config)?;
//! lp.add_route("load", "loading data")?;
//! lp.add_parameters("load", ("rows", 1200))?;
//! lp.bench_it("load")?;
//! lp.add_route("train", "training model")?;
//! lp.bench_it("train")?;
//! let key = lp.save()?;
//! # let _ = key;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod logpose;
mod observability;
pub mod params;
pub mod record;
pub mod reporter;
pub mod route;
pub mod store;

pub use clock::{Clock, format_elapsed};
pub use config::{LogSettings, LogposeConfig};
pub use error::LogposeError;
pub use logpose::{Logpose, LogposeOptions};
pub use observability::init_observability;
pub use params::{ParameterBag, Parameters};
pub use record::{Record, RecordKey, SessionSummary};
pub use reporter::{Reporter, SilentReporter, StdoutReporter};
pub use route::{Route, RouteOptions, RouteStatus};
pub use store::{JsonDirStore, RecordStore};
