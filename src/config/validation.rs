//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (rules reference existing routes)
//! - Compile when clauses
//! - Validate value ranges (tries >= 1, parseable bind address)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure: no file access happens here
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{RoutesFile, RuleSpec, ServiceConfig};
use crate::error::CompileError;
use crate::routing::{RouteTable, Rule};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("route '{route}': invalid URL '{url}': {reason}")]
    InvalidRouteUrl {
        route: String,
        url: String,
        reason: String,
    },

    #[error("rule {rule}: missing required field '{field}'")]
    MissingField { rule: String, field: &'static str },

    #[error("rule '{0}' is defined more than once")]
    DuplicateRule(String),

    #[error("rule '{rule}': routes must not be empty")]
    EmptyRoutes { rule: String },

    #[error("rule '{rule}': route '{route}' is not defined in routes.yml")]
    UnknownRoute { rule: String, route: String },

    #[error("rule '{rule}': route '{route}' is listed more than once")]
    DuplicateRoute { rule: String, route: String },

    #[error("template '{template}' cannot be read: {reason}")]
    TemplateUnreadable { template: String, reason: String },

    #[error("template '{template}' is invalid: {reason}")]
    TemplateInvalid { template: String, reason: String },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

/// Parse one `routes.yml` value. Only absolute http(s) URLs with a host are accepted.
pub fn parse_route_url(route: &str, raw: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidRouteUrl {
        route: route.to_string(),
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Build the route table. Bad entries are left out and reported.
pub fn validate_routes(routes: &RoutesFile) -> (RouteTable, Vec<ValidationError>) {
    let mut table = RouteTable::new();
    let mut errors = Vec::new();

    for (name, raw) in routes {
        match parse_route_url(name, raw) {
            Ok(url) => table.insert(name.clone(), url),
            Err(e) => errors.push(e),
        }
    }

    (table, errors)
}

/// Turn raw rule entries into compiled rules.
///
/// Template references are not checked here; the loader owns template files.
pub fn validate_rules(
    specs: &[RuleSpec],
    routes: &RouteTable,
    autodone: bool,
) -> Result<Vec<Rule>, Vec<ValidationError>> {
    let mut rules = Vec::with_capacity(specs.len());
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, spec) in specs.iter().enumerate() {
        let label = match &spec.name {
            Some(name) => format!("'{}'", name),
            None => format!("#{}", index + 1),
        };
        let missing = |field| ValidationError::MissingField {
            rule: label.clone(),
            field,
        };

        let Some(name) = spec.name.as_deref() else {
            errors.push(missing("name"));
            continue;
        };
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateRule(name.to_string()));
        }

        let mut valid = true;
        match spec.routes.as_deref() {
            None => {
                errors.push(missing("routes"));
                valid = false;
            }
            Some([]) => {
                errors.push(ValidationError::EmptyRoutes {
                    rule: name.to_string(),
                });
                valid = false;
            }
            Some(names) => {
                let mut listed = HashSet::new();
                for route in names {
                    if !routes.contains(route.as_str()) {
                        errors.push(ValidationError::UnknownRoute {
                            rule: name.to_string(),
                            route: route.clone(),
                        });
                        valid = false;
                    } else if !listed.insert(route.as_str()) {
                        errors.push(ValidationError::DuplicateRoute {
                            rule: name.to_string(),
                            route: route.clone(),
                        });
                        valid = false;
                    }
                }
            }
        }

        let Some(template) = spec.template.as_deref() else {
            errors.push(missing("template"));
            continue;
        };

        let mut rule = Rule::new(name, spec.routes.clone().unwrap_or_default(), template)
            .with_headers(spec.headers.clone())
            .with_done(spec.done.unwrap_or(autodone));

        if let Some(when) = spec.when.as_deref() {
            match rule.with_when(when) {
                Ok(compiled) => rule = compiled,
                Err(e) => {
                    errors.push(e.into());
                    continue;
                }
            }
        }

        if valid {
            rules.push(rule);
        }
    }

    if errors.is_empty() {
        Ok(rules)
    } else {
        Err(errors)
    }
}

/// Range checks on service settings.
pub fn validate_settings(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.dispatch.tries < 1 {
        errors.push(ValidationError::InvalidSetting {
            field: "dispatch.tries",
            reason: "must be at least 1".to_string(),
        });
    }
    if config.dispatch.max_in_flight < 1 {
        errors.push(ValidationError::InvalidSetting {
            field: "dispatch.max_in_flight",
            reason: "must be at least 1".to_string(),
        });
    }
    if config.dispatch.request_timeout_secs == 0 {
        errors.push(ValidationError::InvalidSetting {
            field: "dispatch.request_timeout_secs",
            reason: "must be greater than 0".to_string(),
        });
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::InvalidSetting {
            field: "listener.max_body_size",
            reason: "must be greater than 0".to_string(),
        });
    }
    if let Err(e) = config.listener.bind_address.parse::<SocketAddr>() {
        errors.push(ValidationError::InvalidSetting {
            field: "listener.bind_address",
            reason: e.to_string(),
        });
    }
    if config.observability.metrics_enabled {
        if let Err(e) = config.observability.metrics_address.parse::<SocketAddr>() {
            errors.push(ValidationError::InvalidSetting {
                field: "observability.metrics_address",
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
