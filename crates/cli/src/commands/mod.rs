//! Command implementations.

mod run;
mod validate;

pub use run::run_agent;
pub use validate::run_validate;
