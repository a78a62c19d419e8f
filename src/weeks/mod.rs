pub mod models;

pub use models::{picks_required_for, WeekConfig, WeekSyncOutcome};
