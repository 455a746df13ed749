//! Backend configuration, loaded from ripple.toml.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// HIP backend tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Size of each arena block in bytes. Transient recording state (staged
    /// transfer sources, kernel argument arrays) grows in blocks of this
    /// size per begin/end cycle.
    #[serde(default = "default_arena_block_size")]
    pub arena_block_size: usize,
    /// Explicit path of the HIP runtime library, overriding the platform
    /// search list.
    pub driver_path: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            arena_block_size: default_arena_block_size(),
            driver_path: None,
        }
    }
}

fn default_arena_block_size() -> usize {
    32 * 1024
}

impl BackendConfig {
    /// Load from the path in RIPPLE_CONFIG, falling back to ./ripple.toml,
    /// falling back to defaults. A malformed file is reported and ignored.
    pub fn load() -> Self {
        let path = std::env::var("RIPPLE_CONFIG").unwrap_or_else(|_| "ripple.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!("failed to parse {}: {} - using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}
