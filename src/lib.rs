pub mod app;
pub mod core;

pub use app::{AppError, Outcome, Settings, run_check, run_format, run_stats, run_update};
