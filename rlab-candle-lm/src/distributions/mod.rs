pub mod categorical_distribution;
