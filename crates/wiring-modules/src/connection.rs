use wiring_module_sdk::prelude::*;

pub const EUCLIDEAN_CONNECTION_ID: &str = "wiring.euclidean_connection";

/// Metres of cable per floor plan coordinate unit.
pub const DEFAULT_SCALE: f64 = 0.01;

const SCALE_SETTING: &str = "scale";

/// Estimates cable runs as straight lines across the floor plan and picks a
/// conductor section from a fixed power/distance table.
#[derive(Debug, Clone)]
pub struct EuclideanConnectionModule {
    scale: f64,
}

impl Default for EuclideanConnectionModule {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
        }
    }
}

impl EuclideanConnectionModule {
    pub fn scale(&self) -> f64 {
        self.scale
    }
}

fn info() -> ModuleInfo {
    ModuleInfo::new("Euclidean Connection Module", Capability::Connection)
        .with_version("1.0.0")
        .with_description("Estimates cable length and conductor section between elements")
        .with_author("System")
}

/// Section in mm² for a 230 V run, with headroom for voltage drop.
pub fn cable_section(power: f64, distance: f64) -> f64 {
    if power <= 1000.0 {
        if distance <= 10.0 {
            1.5
        } else if distance <= 20.0 {
            2.5
        } else {
            4.0
        }
    } else if power <= 2000.0 {
        if distance <= 10.0 {
            2.5
        } else if distance <= 20.0 {
            4.0
        } else {
            6.0
        }
    } else if distance <= 10.0 {
        4.0
    } else if distance <= 20.0 {
        6.0
    } else {
        10.0
    }
}

impl WiringModule for EuclideanConnectionModule {
    fn info(&self) -> ModuleInfo {
        info()
    }

    fn initialize(&mut self, context: &ModuleContext) -> bool {
        if let Some(value) = context.setting(SCALE_SETTING) {
            match value.as_f64() {
                Some(scale) if scale.is_finite() && scale > 0.0 => self.scale = scale,
                _ => {
                    tracing::warn!(
                        module = context.name(),
                        %value,
                        "rejecting invalid scale setting"
                    );
                    return false;
                }
            }
        }
        tracing::info!(
            module = context.name(),
            scale = self.scale,
            "connection module initialized"
        );
        true
    }

    fn as_connection(&self) -> Option<&dyn ConnectionModule> {
        Some(self)
    }
}

impl ConnectionModule for EuclideanConnectionModule {
    fn calculate_cable_length(&self, from: &Element, to: &Element) -> f64 {
        let distance = ((to.x - from.x).powi(2) + (to.y - from.y).powi(2)).sqrt();
        distance * self.scale
    }

    fn suggest_cable_section(&self, power: f64, distance: f64) -> f64 {
        cable_section(power, distance)
    }
}

pub struct EuclideanConnectionFactory;

impl ModuleFactory for EuclideanConnectionFactory {
    fn id(&self) -> &str {
        EUCLIDEAN_CONNECTION_ID
    }

    fn info(&self) -> ModuleInfo {
        info()
    }

    fn create(&self) -> Box<dyn WiringModule> {
        Box::new(EuclideanConnectionModule::default())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiring_project::NewElement;

    use super::*;

    fn at(x: f64, y: f64) -> Element {
        NewElement::new(1, "E", "socket", "E", x, y).to_element(1)
    }

    #[test]
    fn length_is_scaled_euclidean_distance() {
        let module = EuclideanConnectionModule::default();
        let length = module.calculate_cable_length(&at(0.0, 0.0), &at(300.0, 400.0));
        assert!((length - 5.0).abs() < 1e-12);

        let (x1, y1, x2, y2): (f64, f64, f64, f64) = (12.5, -3.0, -40.25, 77.0);
        let expected = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt() * 0.01;
        let length = module.calculate_cable_length(&at(x1, y1), &at(x2, y2));
        assert!((length - expected).abs() < 1e-12);
    }

    #[test]
    fn identical_points_have_zero_length() {
        let module = EuclideanConnectionModule::default();
        assert_eq!(
            module.calculate_cable_length(&at(42.0, 17.0), &at(42.0, 17.0)),
            0.0
        );
    }

    #[test]
    fn section_boundaries_fall_into_lower_bracket() {
        let module = EuclideanConnectionModule::default();
        assert_eq!(module.suggest_cable_section(1000.0, 10.0), 1.5);
        assert_eq!(module.suggest_cable_section(1000.0, 10.0001), 2.5);
        assert_eq!(module.suggest_cable_section(1001.0, 10.0), 2.5);
        assert_eq!(module.suggest_cable_section(2000.0, 20.0), 4.0);
        assert_eq!(module.suggest_cable_section(2001.0, 21.0), 10.0);
    }

    #[test]
    fn section_table_covers_every_cell() {
        let table = [
            (500.0, [1.5, 2.5, 4.0]),
            (1500.0, [2.5, 4.0, 6.0]),
            (3000.0, [4.0, 6.0, 10.0]),
        ];
        for (power, expected) in table {
            let actual = [5.0, 15.0, 25.0].map(|distance| cable_section(power, distance));
            assert_eq!(actual, expected, "power {power}");
        }
    }

    #[test]
    fn scale_setting_overrides_default() {
        let mut module = EuclideanConnectionModule::default();
        let context = ModuleContext::new("cables").with_settings(json!({"scale": 0.02}));
        assert!(module.initialize(&context));
        assert_eq!(module.scale(), 0.02);

        let mut rejected = EuclideanConnectionModule::default();
        let context = ModuleContext::new("cables").with_settings(json!({"scale": -1}));
        assert!(!rejected.initialize(&context));
    }

    #[test]
    fn reports_connection_capability() {
        let module = EuclideanConnectionFactory.create();
        assert_eq!(module.capability(), Capability::Connection);
        assert!(module.as_export().is_none());
    }
}
