pub mod quota;
pub mod suppression;
