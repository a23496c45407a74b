//! customcmd: parser and evaluator for the Custom Command template language.
//!
//! A template such as `/me $upper($1) says $if(msg,$(msg),nothing)` is parsed once
//! into an immutable [`core::items::Items`] tree and evaluated any number of times
//! against a [`core::parameters::Parameters`] set.

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod state;
pub mod system;

pub use crate::core::command::{CustomCommand, CustomCommands};
pub use crate::core::parameters::Parameters;
pub use crate::core::parser::ParseError;
