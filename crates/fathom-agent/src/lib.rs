//! Shared plumbing for the two demo binaries: configuration loading and the
//! synthetic media generator that exercises the control loop without a real
//! decoder.

pub mod synth;

use std::path::Path;

use fathom_core::config::Config;
use fathom_core::error::FathomError;

/// Load configuration from `path` if it exists, otherwise fall back to
/// built-in defaults. An explicit `--config` pointing at a missing file is
/// not treated as fatal — only a present-but-malformed file is.
pub fn load_config(path: &Path) -> Result<Config, FathomError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    Config::load_from_path(path)
}
