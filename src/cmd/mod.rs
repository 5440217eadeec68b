pub mod operators;
pub mod run;
