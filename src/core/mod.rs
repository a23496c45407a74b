// src/core/mod.rs

//! The template language: parsing, evaluation, and the command registry.

pub mod calc;
pub mod command;
pub mod commons;
pub mod config_loader;
pub mod datetime;
pub mod functions;
pub mod items;
pub mod json_path;
pub mod parameters;
pub mod parser;
pub mod paths;
pub mod reader;
pub mod rounding;
