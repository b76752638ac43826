//! Dependency list validation
//!
//! Advisory checks over a list of dependencies. The loader never rejects
//! input on these grounds; the results are for configuration tooling and
//! startup warnings.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::module::registry::descriptor::{Dependency, Source};
use crate::module::scope::html::parse_selector;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Every dependency can load as written
    Valid,
    /// Problems found, one message per problem
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn problems(&self) -> &[String] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid(problems) => problems,
        }
    }
}

/// Dependency validator
pub struct DependencyValidator {
    /// Maximum name length
    max_name_len: usize,
}

impl DependencyValidator {
    /// Create a new dependency validator
    pub fn new() -> Self {
        Self { max_name_len: 128 }
    }

    /// Validate a list of dependencies
    pub fn validate(&self, dependencies: &[Dependency]) -> ValidationResult {
        let mut errors = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut unnamed_loaders = 0usize;

        for (index, dependency) in dependencies.iter().enumerate() {
            let label = Self::label(index, dependency);

            match dependency.selector.as_deref() {
                None => errors.push(format!("{}: no selector, it will never load", label)),
                Some(selector) if selector.trim().is_empty() => {
                    errors.push(format!("{}: empty selector, it will never load", label))
                }
                Some(selector) => {
                    if let Err(e) = parse_selector(selector) {
                        errors.push(format!("{}: {}", label, e));
                    }
                }
            }

            if let Err(source_errors) = self.validate_source(&label, dependency.source.as_ref()) {
                errors.extend(source_errors);
            }

            match dependency.name.as_deref() {
                Some(name) => {
                    if name.is_empty() || name.len() > self.max_name_len {
                        errors.push(format!("{}: invalid name length", label));
                    }
                    if let Some(first) = seen.insert(name, index) {
                        errors.push(format!(
                            "{}: duplicate name, entry from #{} will be replaced",
                            label, first
                        ));
                    }
                }
                None if dependency.source.is_some() => unnamed_loaders += 1,
                None => {}
            }
        }

        if unnamed_loaders > 1 {
            errors.push(format!(
                "{} unnamed dependencies with sources share one registry slot; only the last to finish is kept",
                unnamed_loaders
            ));
        }

        if errors.is_empty() {
            debug!("Dependency validation passed for {} entries", dependencies.len());
            ValidationResult::Valid
        } else {
            warn!("Dependency validation found {} problem(s)", errors.len());
            ValidationResult::Invalid(errors)
        }
    }

    /// Validate source references
    fn validate_source(&self, label: &str, source: Option<&Source>) -> Result<(), Vec<String>> {
        let references: &[String] = match source {
            None => return Ok(()),
            Some(Source::One(reference)) => std::slice::from_ref(reference),
            Some(Source::Many(references)) => references,
        };

        let errors: Vec<String> = references
            .iter()
            .enumerate()
            .filter(|(_, reference)| reference.trim().is_empty())
            .map(|(position, _)| format!("{}: empty source reference at {}", label, position))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn label(index: usize, dependency: &Dependency) -> String {
        match dependency.name.as_deref() {
            Some(name) => format!("dependency #{} ({})", index, name),
            None => format!("dependency #{}", index),
        }
    }
}

impl Default for DependencyValidator {
    fn default() -> Self {
        Self::new()
    }
}
