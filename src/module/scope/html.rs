//! HTML document scope backed by `scraper`
//!
//! The parsed tree is not `Send`, so the document keeps its markup and
//! parses on each query. Queries happen once per dependency during `load`,
//! before any task is spawned.

use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::module::scope::elements::{Element, ElementSet};
use crate::module::traits::{DomQuery, ModuleError};

/// Parse a CSS selector, mapping failures to [`ModuleError::InvalidSelector`]
pub fn parse_selector(selector: &str) -> Result<Selector, ModuleError> {
    Selector::parse(selector)
        .map_err(|e| ModuleError::InvalidSelector(format!("{}: {:?}", selector, e)))
}

/// An HTML document (or fragment) that selectors are evaluated against
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    markup: Arc<str>,
    fragment: bool,
}

impl HtmlDocument {
    /// Wrap a full HTML document
    pub fn parse(markup: impl Into<String>) -> Self {
        Self {
            markup: Arc::from(markup.into()),
            fragment: false,
        }
    }

    /// Wrap an HTML fragment
    pub fn fragment(markup: impl Into<String>) -> Self {
        Self {
            markup: Arc::from(markup.into()),
            fragment: true,
        }
    }

    /// Read a document from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let markup = std::fs::read_to_string(path)?;
        Ok(Self::parse(markup))
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    fn tree(&self) -> Html {
        if self.fragment {
            Html::parse_fragment(&self.markup)
        } else {
            Html::parse_document(&self.markup)
        }
    }
}

fn snapshot(element: ElementRef<'_>, position: usize) -> Element {
    let value = element.value();
    Element {
        tag: value.name().to_string(),
        id: value.id().map(str::to_string),
        classes: value.classes().map(str::to_string).collect(),
        attributes: value
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        text: element.text().collect(),
        inner_html: element.inner_html(),
        position,
    }
}

impl DomQuery for HtmlDocument {
    fn select(&self, selector: &str, scope: Option<&str>) -> Result<ElementSet, ModuleError> {
        let target = parse_selector(selector)?;
        let scope_selector = scope.map(parse_selector).transpose()?;

        let tree = self.tree();

        let positions: HashMap<_, usize> = tree
            .root_element()
            .descendants()
            .filter(|node| node.value().is_element())
            .enumerate()
            .map(|(index, node)| (node.id(), index))
            .collect();

        let roots: Option<HashSet<_>> = scope_selector
            .as_ref()
            .map(|s| tree.select(s).map(|root| root.id()).collect());

        let elements: ElementSet = tree
            .select(&target)
            .filter(|element| match &roots {
                None => true,
                Some(roots) => element.ancestors().any(|a| roots.contains(&a.id())),
            })
            .map(|element| {
                let position = positions.get(&element.id()).copied().unwrap_or_default();
                snapshot(element, position)
            })
            .collect();

        debug!(
            "Selector {:?} matched {} element(s) in scope {:?}",
            selector,
            elements.len(),
            scope
        );
        Ok(elements)
    }
}
