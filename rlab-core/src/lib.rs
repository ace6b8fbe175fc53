pub mod agents;
pub mod buffers;
pub mod env;
pub mod error;
pub mod rng;
pub mod training;
pub mod utils;
