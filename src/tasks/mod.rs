pub mod reconciliation;
pub mod scheduler;
