pub mod nested_routes;
pub mod tuning_sweep;

pub use first_test::first_test_run;
pub use nested_routes::nested_routes_run;
pub use tuning_sweep::tuning_sweep_run;
