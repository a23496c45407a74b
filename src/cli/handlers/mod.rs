// src/cli/handlers/mod.rs

// One module per CLI action.

pub mod check;
pub mod commons;
pub mod exec;
pub mod list;
pub mod run;
