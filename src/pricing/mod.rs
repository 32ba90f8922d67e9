pub mod savings;

pub use savings::{evaluate_savings, savings_fraction, SavingsDecision};
