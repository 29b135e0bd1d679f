pub mod prelude;

pub mod daily_usage;
pub mod hidden_targets;
