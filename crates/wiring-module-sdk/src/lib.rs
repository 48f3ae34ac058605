//! Wiring Designer Module SDK
//! ==========================
//!
//! Capability contract for wiring designer modules: the [`WiringModule`]
//! lifecycle trait, its element, connection and export refinements, and the
//! factory catalog the host resolves unit manifests against.

mod contract;
mod error;
mod info;
mod registry;

pub use contract::{
    ConnectionModule, ElementModule, ExportModule, ModuleContext, ModuleDirectory, WiringModule,
};
pub use error::{CatalogError, ExportError};
pub use info::{Capability, ModuleInfo};
pub use registry::{ModuleCatalog, ModuleFactory};

/// Common imports for module authors.
pub mod prelude {
    pub use crate::{
        Capability, ConnectionModule, ElementModule, ExportError, ExportModule, ModuleCatalog,
        ModuleContext, ModuleFactory, ModuleInfo, WiringModule,
    };
    pub use wiring_project::{Element, ProjectBundle};
}

/// Declare a catalog constructor for a set of module factories.
///
/// The macro expects a function name followed by one or more expressions
/// that evaluate to types implementing [`ModuleFactory`]. The generated
/// function returns the populated [`ModuleCatalog`], or the first duplicate
/// id it encountered.
///
/// # Example
///
/// ```ignore
/// use wiring_module_sdk::declare_wiring_modules;
///
/// declare_wiring_modules!(stock_catalog => CableFactory, ExportFactory);
/// ```
#[macro_export]
macro_rules! declare_wiring_modules {
    ($name:ident => $($factory:expr),+ $(,)?) => {
        pub fn $name() -> ::std::result::Result<$crate::ModuleCatalog, $crate::CatalogError> {
            let mut catalog = $crate::ModuleCatalog::new();
            $(catalog.register_factory(Box::new($factory))?;)+
            Ok(catalog)
        }
    };
}
