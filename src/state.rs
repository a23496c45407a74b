// src/state.rs

use crate::core::command::CustomCommands;
use std::sync::{Arc, OnceLock};

static COMMANDS: OnceLock<Arc<CustomCommands>> = OnceLock::new();

/// The process-wide command registry, empty until something loads it.
///
/// Handing out the `Arc` lets the registry be placed into an evaluation
/// context for `$replace(..., regCustom)` while staying reloadable.
pub fn get_commands() -> &'static Arc<CustomCommands> {
    COMMANDS.get_or_init(|| Arc::new(CustomCommands::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_shared() {
        let first = Arc::clone(get_commands());
        let second = get_commands();
        assert!(Arc::ptr_eq(&first, second));
    }
}
