use std::collections::BTreeMap;

use crate::{CatalogError, ModuleInfo, WiringModule};

/// Constructor for one kind of module. Reloading a module re-runs its
/// factory.
pub trait ModuleFactory: Send + Sync {
    /// Stable identifier referenced from unit manifests.
    fn id(&self) -> &str;
    fn info(&self) -> ModuleInfo;
    fn create(&self) -> Box<dyn WiringModule>;
}

/// Table of factories known to the host, keyed by factory id.
#[derive(Default)]
pub struct ModuleCatalog {
    factories: BTreeMap<String, Box<dyn ModuleFactory>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers a factory. Each id resolves to exactly one factory, so a
    /// second registration under the same id is rejected.
    pub fn register_factory(
        &mut self,
        factory: Box<dyn ModuleFactory>,
    ) -> Result<&mut Self, CatalogError> {
        let id = factory.id().to_string();
        if self.factories.contains_key(&id) {
            return Err(CatalogError::Duplicate(id));
        }
        self.factories.insert(id, factory);
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&dyn ModuleFactory> {
        self.factories.get(id).map(|factory| factory.as_ref())
    }

    /// Factories in lexical id order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn ModuleFactory> {
        self.factories.values().map(|factory| factory.as_ref())
    }

    pub fn ids(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Capability, ModuleContext};

    struct Noop;

    impl WiringModule for Noop {
        fn info(&self) -> ModuleInfo {
            ModuleInfo::new("Noop", Capability::Generic)
        }

        fn initialize(&mut self, _context: &ModuleContext) -> bool {
            true
        }
    }

    struct NoopFactory(&'static str);

    impl ModuleFactory for NoopFactory {
        fn id(&self) -> &str {
            self.0
        }

        fn info(&self) -> ModuleInfo {
            ModuleInfo::new("Noop", Capability::Generic)
        }

        fn create(&self) -> Box<dyn WiringModule> {
            Box::new(Noop)
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut catalog = ModuleCatalog::new();
        catalog
            .register_factory(Box::new(NoopFactory("noop")))
            .unwrap();
        let err = catalog
            .register_factory(Box::new(NoopFactory("noop")))
            .err()
            .unwrap();
        assert!(matches!(err, CatalogError::Duplicate(id) if id == "noop"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn iteration_is_in_id_order() {
        let mut catalog = ModuleCatalog::new();
        catalog
            .register_factory(Box::new(NoopFactory("b")))
            .unwrap()
            .register_factory(Box::new(NoopFactory("a")))
            .unwrap();
        let ids: Vec<_> = catalog.iter().map(|factory| factory.id().to_string()).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert!(catalog.get("a").is_some());
        assert!(catalog.get("c").is_none());
    }
}
