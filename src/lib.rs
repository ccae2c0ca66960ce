//! Manul frame: a map plus a captioned wildlife photo (or a clock,
//! reminders and weather dashboard) rendered for a 7.5" black/white
//! e-paper panel.

pub mod config;
pub mod display;
pub mod image_proc;
pub mod refresh;
pub mod render;
pub mod sources;

pub use config::{Config, ConfigError};
pub use refresh::{DashboardRefresher, RefreshError, Refresher};
