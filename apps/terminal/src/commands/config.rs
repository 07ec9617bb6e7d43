//! # Config Commands

use crate::state::ConfigState;

/// Returns the effective configuration.
pub fn get_config(config: &ConfigState) -> ConfigState {
    config.clone()
}
