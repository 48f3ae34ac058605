//! Discovery and lifecycle management for wiring designer modules.
//!
//! Modules are described by JSON unit manifests in a single directory. Each
//! manifest names a factory from the [`ModuleCatalog`] the host was built
//! with; the [`ModuleRegistry`] instantiates, initializes and tracks them.

mod discovery;
mod error;
pub mod management;
mod registry;

pub use discovery::{
    default_unit_name, persist_enabled, resolve_candidate, scan_candidates, write_stock_manifests,
    DiscoveryConfig, DiscoveryResult, ModuleCandidate, ModuleManifest, MANIFEST_EXTENSION,
    RESERVED_UNITS,
};
pub use error::HostError;
pub use registry::{LoadFailure, LoadReport, LoadedModule, ModuleDescriptor, ModuleRegistry};
pub use wiring_module_sdk::ModuleCatalog;
