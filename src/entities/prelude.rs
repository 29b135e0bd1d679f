pub use super::daily_usage::Entity as DailyUsage;
pub use super::hidden_targets::Entity as HiddenTargets;
