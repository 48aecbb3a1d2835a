//! Command implementations for sentry-console

pub mod alerts;
pub mod analyze;
pub mod camera;
pub mod health;
pub mod reports;

pub use alerts::alerts;
pub use analyze::analyze;
pub use camera::{report, start, stop};
pub use health::health;
pub use reports::{delete, download, reports};
