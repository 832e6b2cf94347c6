//! Example: one run per learning rate under the same logpose name, then compare them.

use std::error::Error;
use std::path::Path;

use logpose_core::{Logpose, LogposeConfig};
use logpose_history::{ComparisonTable, History};

const NAME: &str = "Sweep";

/// Toy gradient descent on `(x - 3)^2`; returns the final loss.
fn descend(learning_rate: f64, steps: u32) -> f64 {
    let mut x = 0.0_f64;
    for _ in 0..steps {
        x -= learning_rate * 2.0 * (x - 3.0);
    }
    (x - 3.0).powi(2)
}

/// Logs one run per learning rate and writes the comparison to `csv_path`.
pub fn tuning_sweep_run(
    config: &LogposeConfig,
    learning_rates: &[f64],
    csv_path: impl AsRef<Path>,
) -> Result<ComparisonTable, Box<dyn Error>> {
    for &lr in learning_rates {
        let mut lp = Logpose::new(NAME, format!("lr={lr}"), config)?;
        lp.add_route("setup", "initialize parameters")?;
        lp.add_parameters("setup", ("steps", 100))?;
        lp.bench_it("setup")?;

        lp.add_route("train", "gradient descent")?;
        lp.add_parameters("train", ("lr", lr))?;
        lp.add_parameters("train", ("loss", descend(lr, 100)))?;
        lp.bench_it("train")?;
        lp.save()?;
    }

    let table = History::open(NAME, config)?.compare_table()?;
    table.write_csv(csv_path)?;
    Ok(table)
}
