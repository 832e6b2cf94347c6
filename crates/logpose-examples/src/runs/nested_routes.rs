//! Example: nested routes closed without naming them. The innermost route closes first,
//! and an unnamed close with nothing left open saves the logpose.

use std::error::Error;

use logpose_core::{Logpose, LogposeConfig};
use serde_json::json;

pub fn nested_routes_run(config: &LogposeConfig) -> Result<Option<String>, Box<dyn Error>> {
    let mut lp = Logpose::new("Nested", "pipeline with nested stages", config)?;

    lp.add_route("pipeline", "whole pipeline")?;
    lp.add_parameters_json("pipeline", json!({"stages": 2, "dataset": "iris"}))?;

    lp.add_route("features", "feature extraction")?;
    lp.add_parameters_json("features", json!(["normalize", true]))?;
    lp.close_route(None)?;

    lp.add_route("fit", "model fit")?;
    lp.add_parameters("fit", ("max_depth", 4))?;
    lp.close_route(None)?;

    lp.close_route(None)?;
    lp.close_route(None)?;

    tracing::debug!(saved = lp.is_saved(), "nested example finished");
    Ok(lp.saved_key().map(|k| k.to_string()))
}
