pub mod agent;
pub mod env;
