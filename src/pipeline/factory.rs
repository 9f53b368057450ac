//! Element factory: create elements by registered name.

use crate::element::{ElementDyn, FilterAdapter, SinkAdapter, SourceAdapter};
use crate::elements::{NullSink, PassThrough, TestSource, TestSourceConfig};
use crate::error::{Error, Result};
use std::collections::HashMap;

type Constructor = Box<dyn Fn() -> Result<Box<dyn ElementDyn>> + Send + Sync>;

/// Registry of named element constructors.
///
/// Mirrors string-based element creation: ask for a kind by name and get
/// a fresh element back, or [`Error::ElementCreation`] when the name is
/// unknown.
pub struct ElementFactory {
    constructors: HashMap<String, Constructor>,
}

impl Default for ElementFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ElementFactory {
    /// Create an empty factory with no registered elements.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Create a factory preloaded with the built-in elements.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register("testsrc", || {
            Ok(Box::new(SourceAdapter::new(TestSource::new(
                TestSourceConfig::default(),
            )?)) as Box<dyn ElementDyn>)
        });
        factory.register("passthrough", || {
            Ok(Box::new(FilterAdapter::new(PassThrough::new())) as Box<dyn ElementDyn>)
        });
        factory.register("nullsink", || {
            Ok(Box::new(SinkAdapter::new(NullSink::new())) as Box<dyn ElementDyn>)
        });
        factory
    }

    /// Register a constructor under `name`, replacing any previous one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        constructor: impl Fn() -> Result<Box<dyn ElementDyn>> + Send + Sync + 'static,
    ) {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    /// Create a new element of the named kind.
    pub fn create(&self, name: &str) -> Result<Box<dyn ElementDyn>> {
        match self.constructors.get(name) {
            Some(constructor) => constructor(),
            None => Err(Error::ElementCreation {
                name: name.to_string(),
            }),
        }
    }

    /// Whether a kind is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// List the registered kind names, sorted.
    pub fn list_elements(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementType;

    #[test]
    fn test_builtins_are_creatable() {
        let factory = ElementFactory::with_builtins();
        for name in ["testsrc", "passthrough", "nullsink"] {
            assert!(factory.is_registered(name));
            factory.create(name).unwrap();
        }
    }

    #[test]
    fn test_unknown_name_errors() {
        let factory = ElementFactory::with_builtins();
        assert!(matches!(
            factory.create("fakesink2000"),
            Err(Error::ElementCreation { .. })
        ));
    }

    #[test]
    fn test_custom_registration() {
        let mut factory = ElementFactory::new();
        factory.register("drop", || {
            Ok(Box::new(SinkAdapter::new(NullSink::new())) as Box<dyn ElementDyn>)
        });
        let element = factory.create("drop").unwrap();
        assert_eq!(element.element_type(), ElementType::Sink);
    }

    #[test]
    fn test_list_is_sorted() {
        let factory = ElementFactory::with_builtins();
        let names = factory.list_elements();
        assert_eq!(names, vec!["nullsink", "passthrough", "testsrc"]);
    }
}
