//! Dependency descriptors and input normalization
//!
//! A dependency describes one conditional unit of work: the selector that
//! must match, the sources to resolve, and optional callbacks. Anything the
//! core does not recognize is kept in `options` and handed through to
//! callbacks and factories untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::module::scope::ElementSet;

/// Predicate deciding whether matched elements should be initialized
pub type ValidateFn = Arc<dyn Fn(&ElementSet, &Dependency) -> bool + Send + Sync>;

/// Callback run against matched elements before sources are loaded
pub type InitFn = Arc<dyn Fn(&ElementSet, &Dependency) + Send + Sync>;

/// Source field: one reference or an ordered list of references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Source {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for Source {
    fn from(reference: &str) -> Self {
        Source::One(reference.to_string())
    }
}

impl From<String> for Source {
    fn from(reference: String) -> Self {
        Source::One(reference)
    }
}

impl From<Vec<String>> for Source {
    fn from(references: Vec<String>) -> Self {
        Source::Many(references)
    }
}

impl From<Vec<&str>> for Source {
    fn from(references: Vec<&str>) -> Self {
        Source::Many(references.into_iter().map(str::to_string).collect())
    }
}

/// Dependency descriptor
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawDependency")]
pub struct Dependency {
    /// Registry key. Unnamed dependencies share a single registry slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Selector that must match at least one element in scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Source reference(s) to resolve once matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Free-form kind tag (`type` in configuration), never interpreted
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Free-form handle, never interpreted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip)]
    pub validate: Option<ValidateFn>,
    #[serde(skip)]
    pub init: Option<InitFn>,
    /// Everything else, passed through as-is
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Wire shape of a dependency; `src` is folded into `source` afterwards
#[derive(Deserialize)]
struct RawDependency {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    source: Option<Source>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    handle: Option<String>,
    #[serde(flatten)]
    options: Map<String, Value>,
}

impl From<RawDependency> for Dependency {
    fn from(raw: RawDependency) -> Self {
        let mut options = raw.options;
        let mut source = raw.source;

        if source.is_none() {
            if let Some(src) = options.remove("src") {
                match serde_json::from_value::<Source>(src.clone()) {
                    Ok(parsed) => source = Some(parsed),
                    Err(_) => {
                        options.insert("src".to_string(), src);
                    }
                }
            }
        }

        Dependency {
            name: raw.name,
            selector: raw.selector,
            source,
            kind: raw.kind,
            handle: raw.handle,
            validate: None,
            init: None,
            options,
        }
    }
}

impl Dependency {
    /// Create an empty dependency
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named dependency
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Gate initialization on a predicate over the matched elements
    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&ElementSet, &Dependency) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    /// Run a callback against the matched elements
    pub fn with_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&ElementSet, &Dependency) + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    /// Registry key for this dependency
    pub fn key(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Look up a pass-through option
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Normalize `source` into an ordered list of references
    ///
    /// Returns `None` when there is nothing to load (absent or empty
    /// string). An explicit empty list is kept as `Some(vec![])`.
    pub fn sources(&self) -> Option<Vec<String>> {
        match &self.source {
            None => None,
            Some(Source::One(reference)) if reference.is_empty() => None,
            Some(Source::One(reference)) => Some(vec![reference.clone()]),
            Some(Source::Many(references)) => Some(references.clone()),
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("source", &self.source)
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .field("validate", &self.validate.is_some())
            .field("init", &self.init.is_some())
            .field("options", &self.options)
            .finish()
    }
}

/// Input accepted by [`Initr::load`](crate::module::manager::Initr::load)
#[derive(Debug, Clone)]
pub enum DependencyInput {
    One(Dependency),
    Many(Vec<Dependency>),
}

impl DependencyInput {
    /// Normalize a dynamic value
    ///
    /// Objects become a single dependency and arrays a sequence. Anything
    /// else yields `None`. Array elements that are not valid dependency
    /// objects are dropped without error.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(_) => serde_json::from_value::<Dependency>(value)
                .ok()
                .map(DependencyInput::One),
            Value::Array(items) => Some(DependencyInput::Many(
                items
                    .into_iter()
                    .filter(Value::is_object)
                    .filter_map(|item| serde_json::from_value::<Dependency>(item).ok())
                    .collect(),
            )),
            _ => None,
        }
    }

    pub fn into_vec(self) -> Vec<Dependency> {
        match self {
            DependencyInput::One(dependency) => vec![dependency],
            DependencyInput::Many(dependencies) => dependencies,
        }
    }
}

impl From<Dependency> for DependencyInput {
    fn from(dependency: Dependency) -> Self {
        DependencyInput::One(dependency)
    }
}

impl From<Vec<Dependency>> for DependencyInput {
    fn from(dependencies: Vec<Dependency>) -> Self {
        DependencyInput::Many(dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sources_normalization() {
        assert_eq!(Dependency::new().sources(), None);
        assert_eq!(Dependency::new().with_source("").sources(), None);
        assert_eq!(
            Dependency::new().with_source("mod").sources(),
            Some(vec!["mod".to_string()])
        );
        assert_eq!(
            Dependency::new().with_source(vec!["a", "b"]).sources(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            Dependency::new().with_source(Vec::<String>::new()).sources(),
            Some(vec![])
        );
    }

    #[test]
    fn test_src_alias_and_options() {
        let dependency: Dependency = serde_json::from_value(json!({
            "name": "datepicker",
            "type": "$.fn",
            "handle": "datepicker",
            "src": "vendor/jquery-ui.js",
            "selector": ".datepicker",
            "defaults": { "showOtherMonths": true }
        }))
        .unwrap();

        assert_eq!(dependency.key(), Some("datepicker"));
        assert_eq!(dependency.kind.as_deref(), Some("$.fn"));
        assert_eq!(
            dependency.sources(),
            Some(vec!["vendor/jquery-ui.js".to_string()])
        );
        assert!(dependency.option("src").is_none());
        assert_eq!(
            dependency.option("defaults"),
            Some(&json!({ "showOtherMonths": true }))
        );
    }

    #[test]
    fn test_source_wins_over_src() {
        let dependency: Dependency =
            serde_json::from_value(json!({ "source": "a", "src": "b" })).unwrap();
        assert_eq!(dependency.sources(), Some(vec!["a".to_string()]));
        assert_eq!(dependency.option("src"), Some(&json!("b")));
    }

    #[test]
    fn test_input_from_value() {
        assert!(DependencyInput::from_value(json!(null)).is_none());
        assert!(DependencyInput::from_value(json!(42)).is_none());
        assert!(DependencyInput::from_value(json!("selector")).is_none());

        let one = DependencyInput::from_value(json!({ "selector": ".a" })).unwrap();
        assert_eq!(one.into_vec().len(), 1);

        let many = DependencyInput::from_value(json!([
            { "selector": ".a" },
            7,
            { "selector": 12 },
            { "name": "b" }
        ]))
        .unwrap();
        let names: Vec<_> = many.into_vec().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec![None, Some("b".to_string())]);

        let empty = DependencyInput::from_value(json!([])).unwrap();
        assert!(empty.into_vec().is_empty());
    }

    #[test]
    fn test_debug_hides_callbacks() {
        let dependency = Dependency::named("x").with_init(|_, _| {});
        let rendered = format!("{:?}", dependency);
        assert!(rendered.contains("init: true"));
        assert!(rendered.contains("validate: false"));
    }
}
