//! Configuration loading from disk.
//!
//! A configuration directory holds:
//! ```text
//! <confdir>/routes.yml        route name -> URL
//! <confdir>/rules.yml         ordered rule list
//! <confdir>/templates/<name>  handlebars templates referenced by rules
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::{RoutesFile, RuleSpec, ServiceConfig};
use crate::config::validation::{validate_routes, validate_rules, validate_settings, ValidationError};
use crate::config::RouterConfig;
use crate::dispatch::TemplateTable;
use crate::routing::RuleList;

pub const ROUTES_FILE: &str = "routes.yml";
pub const RULES_FILE: &str = "rules.yml";
pub const TEMPLATES_DIR: &str = "templates";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("broken YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("broken TOML in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_yaml<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T, ConfigError> {
    let content = read(path)?;
    let parsed: Option<T> = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parsed.unwrap_or_default())
}

/// Load and validate service settings from a TOML file.
pub fn load_service_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = read(path)?;
    let config: ServiceConfig = toml::from_str(&content).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    validate_settings(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load routes, rules and templates from `dir`.
///
/// `autodone` is the `done` value for rules that omit it. Every problem found is
/// reported; nothing is returned unless the whole directory is valid.
pub fn load_confdir(dir: &Path, autodone: bool) -> Result<RouterConfig, ConfigError> {
    let routes_file: RoutesFile = read_yaml(&dir.join(ROUTES_FILE))?;
    let specs: Vec<RuleSpec> = read_yaml(&dir.join(RULES_FILE))?;

    let (routes, mut errors) = validate_routes(&routes_file);
    let templates = load_templates(&dir.join(TEMPLATES_DIR), &specs, &mut errors);
    let rules = match validate_rules(&specs, &routes, autodone) {
        Ok(rules) => rules,
        Err(rule_errors) => {
            errors.extend(rule_errors);
            Vec::new()
        }
    };

    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    tracing::info!(
        confdir = %dir.display(),
        routes = routes.len(),
        rules = rules.len(),
        templates = templates.len(),
        "Configuration loaded"
    );

    Ok(RouterConfig {
        routes,
        templates,
        rules: RuleList::new(rules),
    })
}

/// Read and register each distinct template referenced by `specs`, once.
fn load_templates(dir: &Path, specs: &[RuleSpec], errors: &mut Vec<ValidationError>) -> TemplateTable {
    let mut table = TemplateTable::new();
    let mut seen = HashSet::new();

    for name in specs.iter().filter_map(|s| s.template.as_deref()) {
        if !seen.insert(name) {
            continue;
        }

        // Template names address files directly under the templates directory.
        if Path::new(name).file_name().and_then(|f| f.to_str()) != Some(name) {
            errors.push(ValidationError::TemplateUnreadable {
                template: name.to_string(),
                reason: "not a plain file name".to_string(),
            });
            continue;
        }

        let source = match fs::read_to_string(dir.join(name)) {
            Ok(source) => source,
            Err(e) => {
                errors.push(ValidationError::TemplateUnreadable {
                    template: name.to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if let Err(e) = table.register(name, &source) {
            errors.push(ValidationError::TemplateInvalid {
                template: name.to_string(),
                reason: e.to_string(),
            });
        }
    }

    table
}
