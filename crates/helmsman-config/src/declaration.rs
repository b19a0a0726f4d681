use crate::ConfigError;
use std::fs;
use std::path::Path;
use tracing::warn;

/// A single `service.<name>.enable = true|false` line from the declared
/// configuration, in the order it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDeclaration {
    pub name: String,
    pub enabled: bool,
}

/// Read and parse the declared configuration file.
pub fn read_declarations(path: &Path) -> Result<Vec<ServiceDeclaration>, ConfigError> {
    let text = fs::read_to_string(path)?;
    parse_declarations(&text)
}

/// Parse declared configuration text.
///
/// Blank lines and `#` comments are skipped. Every other line must be
/// `service.<name>.enable = <true|false>` with whitespace tolerated around
/// `=`; any malformed line fails the whole parse. Duplicate keys keep the
/// first position and take the last value, with a warning.
pub fn parse_declarations(text: &str) -> Result<Vec<ServiceDeclaration>, ConfigError> {
    let mut declarations: Vec<ServiceDeclaration> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split('=').collect();
        if parts.len() != 2 {
            return Err(ConfigError::InvalidLine(line.to_owned()));
        }

        let key = parts[0].trim();
        let enabled = parts[1].trim() == "true";

        let name = key
            .strip_prefix("service.")
            .and_then(|rest| rest.strip_suffix(".enable"))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ConfigError::InvalidKey(key.to_owned()))?;

        if let Some(existing) = declarations.iter_mut().find(|d| d.name == name) {
            warn!("duplicate declaration for service '{name}': last value wins");
            existing.enabled = enabled;
        } else {
            declarations.push(ServiceDeclaration {
                name: name.to_owned(),
                enabled,
            });
        }
    }

    Ok(declarations)
}
