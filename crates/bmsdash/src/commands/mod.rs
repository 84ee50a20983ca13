//! Command handlers: bridge CLI args -> core calls -> output formatting.

pub mod check_id;
pub mod config_cmd;
pub mod units;
pub mod watch;
