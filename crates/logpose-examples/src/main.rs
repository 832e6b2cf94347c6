//! Run logpose examples from the runs module (one example per file).

mod runs;

use logpose_core::LogposeConfig;

use crate::runs::{first_test_run, nested_routes_run, tuning_sweep_run};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = LogposeConfig::from_env();
    logpose_core::init_observability(&config);
    if config.debug {
        println!("LOGPOSE_DEBUG is set: nothing is persisted, so there is no history to show.");
        nested_routes_run(&config)?;
        return Ok(());
    }

    println!("=== Example: first_test (load -> train) ===\n");
    let (session, table) = first_test_run(&config)?;
    println!("{} ({}) ran in {:.3} s", session.name, session.description, session.time);
    println!("{table}\n");

    println!("=== Example: nested_routes (unnamed closes) ===\n");
    let key = nested_routes_run(&config)?;
    println!("saved as {}\n", key.as_deref().unwrap_or("<debug, not saved>"));

    println!("=== Example: tuning_sweep (compare runs) ===\n");
    let csv_path = config.root().join("Sweep.comparison.csv");
    let table = tuning_sweep_run(&config, &[0.1, 0.01, 0.001], &csv_path)?;
    println!("{}", table.frame());
    println!("Comparison written to {:?}\n", csv_path);

    Ok(())
}
