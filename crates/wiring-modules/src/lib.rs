//! Stock modules shipped with the wiring designer.

mod connection;
mod element;
mod export;

use wiring_module_sdk::declare_wiring_modules;

pub use connection::{
    cable_section, EuclideanConnectionFactory, EuclideanConnectionModule, DEFAULT_SCALE,
    EUCLIDEAN_CONNECTION_ID,
};
pub use element::{ElementNormalizer, ElementNormalizerFactory, ELEMENT_NORMALIZER_ID, KNOWN_KINDS};
pub use export::{TabularExporter, TabularExporterFactory, TABULAR_EXPORTER_ID};

declare_wiring_modules!(
    stock_catalog => EuclideanConnectionFactory,
    ElementNormalizerFactory,
    TabularExporterFactory,
);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn stock_catalog_lists_every_factory() {
        let catalog = stock_catalog().unwrap();
        assert_eq!(
            catalog.ids(),
            vec![
                ELEMENT_NORMALIZER_ID.to_string(),
                EUCLIDEAN_CONNECTION_ID.to_string(),
                TABULAR_EXPORTER_ID.to_string(),
            ]
        );
    }
}
