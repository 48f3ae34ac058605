use wiring_module_sdk::prelude::*;

pub const ELEMENT_NORMALIZER_ID: &str = "wiring.element_normalizer";

/// Element kinds understood by the schematic editor.
pub const KNOWN_KINDS: &[&str] = &["socket", "switch", "lamp", "equipment", "panel"];

/// Cleans up user input on elements and rejects ones the editor cannot draw.
#[derive(Debug, Clone, Default)]
pub struct ElementNormalizer {
    extra_kinds: Vec<String>,
}

impl ElementNormalizer {
    fn knows_kind(&self, kind: &str) -> bool {
        let kind = kind.trim();
        KNOWN_KINDS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(kind))
            || self
                .extra_kinds
                .iter()
                .any(|known| known.eq_ignore_ascii_case(kind))
    }
}

fn info() -> ModuleInfo {
    ModuleInfo::new("Element Normalizer", Capability::Element)
        .with_description("Validates element kinds and coordinates, trims identifiers")
        .with_author("System")
}

impl WiringModule for ElementNormalizer {
    fn info(&self) -> ModuleInfo {
        info()
    }

    fn initialize(&mut self, context: &ModuleContext) -> bool {
        // Optional `kinds` setting extends the built-in list.
        if let Some(kinds) = context.setting("kinds") {
            let Some(kinds) = kinds.as_array() else {
                tracing::warn!(module = context.name(), "`kinds` setting must be an array");
                return false;
            };
            self.extra_kinds = kinds
                .iter()
                .filter_map(|kind| kind.as_str())
                .map(|kind| kind.trim().to_ascii_lowercase())
                .collect();
        }
        true
    }

    fn as_element(&self) -> Option<&dyn ElementModule> {
        Some(self)
    }
}

impl ElementModule for ElementNormalizer {
    fn process_element(&self, mut element: Element) -> Element {
        element.element_id = element.element_id.trim().to_string();
        element.name = element.name.trim().to_string();
        element.kind = element.kind.trim().to_ascii_lowercase();
        element
    }

    fn validate_element(&self, element: &Element) -> bool {
        !element.element_id.trim().is_empty()
            && !element.name.trim().is_empty()
            && element.x.is_finite()
            && element.y.is_finite()
            && self.knows_kind(&element.kind)
    }
}

pub struct ElementNormalizerFactory;

impl ModuleFactory for ElementNormalizerFactory {
    fn id(&self) -> &str {
        ELEMENT_NORMALIZER_ID
    }

    fn info(&self) -> ModuleInfo {
        info()
    }

    fn create(&self) -> Box<dyn WiringModule> {
        Box::new(ElementNormalizer::default())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiring_project::NewElement;

    use super::*;

    fn element(kind: &str, x: f64) -> Element {
        NewElement::new(1, " S1 ", kind, " Kitchen ", x, 0.0).to_element(1)
    }

    #[test]
    fn process_trims_and_lowercases() {
        let module = ElementNormalizer::default();
        let processed = module.process_element(element(" Socket", 1.0));
        assert_eq!(processed.element_id, "S1");
        assert_eq!(processed.name, "Kitchen");
        assert_eq!(processed.kind, "socket");
    }

    #[test]
    fn validate_rejects_unknown_kind_and_nan() {
        let module = ElementNormalizer::default();
        assert!(module.validate_element(&element("Lamp", 1.0)));
        assert!(!module.validate_element(&element("router", 1.0)));
        assert!(!module.validate_element(&element("lamp", f64::NAN)));

        let mut blank = element("lamp", 1.0);
        blank.name = "   ".into();
        assert!(!module.validate_element(&blank));
    }

    #[test]
    fn kinds_setting_extends_known_kinds() {
        let mut module = ElementNormalizer::default();
        let context = ModuleContext::new("normalizer").with_settings(json!({"kinds": ["Router"]}));
        assert!(module.initialize(&context));
        assert!(module.validate_element(&element("router", 1.0)));

        let mut broken = ElementNormalizer::default();
        let context = ModuleContext::new("normalizer").with_settings(json!({"kinds": "router"}));
        assert!(!broken.initialize(&context));
    }
}
