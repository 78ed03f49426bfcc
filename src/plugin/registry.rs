//! Plugin registry: identifier → factory table

use std::fmt;

use super::{BenchmarkPlugin, Features, Params};
use crate::{Error, Result};

/// Constructor for a plugin instance: `(instance_name, params) -> plugin`.
pub type PluginFactory = Box<dyn Fn(&str, &Params) -> Box<dyn BenchmarkPlugin>>;

struct Entry {
    module: String,
    class: String,
    factory: PluginFactory,
}

impl Entry {
    fn identifier(&self) -> String {
        format!("{}.{}", self.module, self.class)
    }
}

/// Registration table of benchmark plugins.
///
/// Plugins are addressed as `"<module>.<ClassName>"`. A bare module name
/// resolves to the first class registered for that module.
#[derive(Default)]
pub struct PluginRegistry {
    entries: Vec<Entry>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin factory. Re-registering an identifier replaces it.
    pub fn register<F>(&mut self, module: &str, class: &str, factory: F)
    where
        F: Fn(&str, &Params) -> Box<dyn BenchmarkPlugin> + 'static,
    {
        let factory: PluginFactory = Box::new(factory);
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.module == module && e.class == class)
        {
            entry.factory = factory;
            return;
        }
        self.entries.push(Entry {
            module: module.to_string(),
            class: class.to_string(),
            factory,
        });
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every registered identifier, in registration order.
    #[must_use]
    pub fn available_plugins(&self) -> Vec<String> {
        self.entries.iter().map(Entry::identifier).collect()
    }

    /// Check if an identifier resolves.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.find(identifier).is_some()
    }

    /// Resolve an identifier to its factory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginNotFound`] if nothing matches.
    pub fn resolve(&self, identifier: &str) -> Result<&PluginFactory> {
        self.find(identifier)
            .map(|entry| &entry.factory)
            .ok_or_else(|| Error::PluginNotFound(identifier.to_string()))
    }

    /// Resolve an identifier and construct an instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginNotFound`] if nothing matches.
    pub fn instantiate(
        &self,
        identifier: &str,
        instance_name: &str,
        params: &Params,
    ) -> Result<Box<dyn BenchmarkPlugin>> {
        let factory = self.resolve(identifier)?;
        Ok(factory(instance_name, params))
    }

    /// Features of a plugin, read from a probe instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginNotFound`] if nothing matches.
    pub fn features(&self, identifier: &str) -> Result<Features> {
        let probe = self.instantiate(identifier, "", &Params::new())?;
        Ok(probe.features())
    }

    fn find(&self, identifier: &str) -> Option<&Entry> {
        match identifier.split_once('.') {
            Some((module, class)) => self
                .entries
                .iter()
                .find(|e| e.module == module && e.class == class),
            None => self.entries.iter().find(|e| e.module == identifier),
        }
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.available_plugins())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::BenchmarkOutput;
    use serde_json::json;

    struct Probe {
        name: String,
        tag: &'static str,
    }

    impl BenchmarkPlugin for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn features(&self) -> Features {
            Features::new(self.tag)
        }

        fn run(&mut self) -> anyhow::Result<BenchmarkOutput> {
            Ok(json!({"tag": self.tag}).into())
        }
    }

    fn factory(tag: &'static str) -> impl Fn(&str, &Params) -> Box<dyn BenchmarkPlugin> {
        move |name: &str, _params: &Params| {
            Box::new(Probe {
                name: name.to_string(),
                tag,
            }) as Box<dyn BenchmarkPlugin>
        }
    }

    fn registry() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.register("throughput", "Rfc2544Throughput", factory("rfc"));
        registry.register("throughput", "MultiTenancy", factory("multi"));
        registry.register("latency", "PingLatency", factory("ping"));
        registry
    }

    #[test]
    fn test_available_plugins_order() {
        assert_eq!(
            registry().available_plugins(),
            vec![
                "throughput.Rfc2544Throughput",
                "throughput.MultiTenancy",
                "latency.PingLatency"
            ]
        );
    }

    #[test]
    fn test_resolve_exact_and_bare_module() {
        let registry = registry();
        let exact = registry
            .instantiate("throughput.MultiTenancy", "t_0", &Params::new())
            .unwrap();
        assert_eq!(exact.features().description, "multi");

        let bare = registry.instantiate("throughput", "t_1", &Params::new()).unwrap();
        assert_eq!(bare.features().description, "rfc");
        assert_eq!(bare.name(), "t_1");
    }

    #[test]
    fn test_resolve_missing() {
        let registry = registry();
        assert!(matches!(
            registry.resolve("throughput.Nope"),
            Err(Error::PluginNotFound(id)) if id == "throughput.Nope"
        ));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = registry();
        registry.register("latency", "PingLatency", factory("ping2"));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.features("latency").unwrap().description, "ping2");
    }
}
