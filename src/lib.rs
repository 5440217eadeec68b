pub mod algorithm;
pub mod chromosome;
pub mod config;
pub mod error;
pub mod operators;
pub mod population;
