//! Reading the TOML config file
//!
//! The file is read once; the parsed settings and the hash recorded on each
//! sync run both come from that same content.

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates config text
fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex SHA-256 of the raw config text
fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Loads a sync configuration
///
/// Missing `[crawler]` keys fall back to their defaults; the other sections
/// are required. The result has passed validation.
///
/// ```no_run
/// use std::path::Path;
/// use zighang_sync::config::load_config;
///
/// let config = load_config(Path::new("zighang.toml")).unwrap();
/// println!("Sitemap index: {}", config.source.sitemap_index_url());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Fingerprint of a config file, stored with every run
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(hash_content(&std::fs::read_to_string(path)?))
}

/// Loads a configuration together with the fingerprint of the text it came from
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}
