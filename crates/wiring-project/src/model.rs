use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form element properties as edited in the schematic view.
pub type Properties = Map<String, Value>;

/// Editing layer that is currently active in the floor plan view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Floor plan underlay (image or SVG).
    Plan,
    /// Electrical elements drawn on top of the plan.
    #[default]
    Elements,
}

/// Top-level wiring project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Store-assigned identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Timestamp when the project was created.
    pub created_at: DateTime<Utc>,
    /// Drawing scale of the floor plan.
    pub scale: f64,
    /// Floor plan raster, either base64 data or a path.
    pub floor_plan_image: Option<String>,
    /// Floor plan vector data.
    pub floor_plan_svg: Option<String>,
    /// Whether the plan layer is locked against edits.
    pub floor_plan_locked: bool,
    /// Whether the element layer is locked against edits.
    pub elements_locked: bool,
    /// Layer currently selected for editing.
    pub active_layer: Layer,
}

/// Schematic element placed on the floor plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: u64,
    pub project_id: u64,
    /// User-facing identifier, e.g. `S1` or `L12`.
    pub element_id: String,
    /// Element kind: socket, switch, lamp, equipment, panel.
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub properties: Properties,
}

/// Placement of an element inside the distribution panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelElement {
    pub id: u64,
    pub project_id: u64,
    /// Store identifier of the placed [`Element`].
    pub element_id: u64,
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Cable run between two elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: u64,
    pub project_id: u64,
    pub from_element_id: u64,
    pub to_element_id: u64,
    /// Conductor cross-section in mm².
    pub cable_section: f64,
    pub wire_count: u32,
    /// Cable length in metres, when known.
    pub length: Option<f64>,
}

/// Everything belonging to one project, as handed to exporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectBundle {
    pub project: Project,
    pub elements: Vec<Element>,
    pub connections: Vec<Connection>,
    pub panel_elements: Vec<PanelElement>,
}

impl ProjectBundle {
    /// Looks up an element of this bundle by store identifier.
    pub fn element(&self, id: u64) -> Option<&Element> {
        self.elements.iter().find(|element| element.id == id)
    }

    /// User-facing label for an element reference, falling back to the
    /// numeric id when the element is missing.
    pub fn element_label(&self, id: u64) -> String {
        self.element(id)
            .map(|element| element.element_id.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: default_scale(),
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub scale: Option<f64>,
    pub floor_plan_image: Option<String>,
    pub floor_plan_svg: Option<String>,
    pub floor_plan_locked: Option<bool>,
    pub elements_locked: Option<bool>,
    pub active_layer: Option<Layer>,
}

impl ProjectUpdate {
    pub(crate) fn apply(self, project: &mut Project) {
        if let Some(name) = self.name {
            project.name = name;
        }
        if let Some(scale) = self.scale {
            project.scale = scale;
        }
        if let Some(image) = self.floor_plan_image {
            project.floor_plan_image = Some(image);
        }
        if let Some(svg) = self.floor_plan_svg {
            project.floor_plan_svg = Some(svg);
        }
        if let Some(locked) = self.floor_plan_locked {
            project.floor_plan_locked = locked;
        }
        if let Some(locked) = self.elements_locked {
            project.elements_locked = locked;
        }
        if let Some(layer) = self.active_layer {
            project.active_layer = layer;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewElement {
    pub project_id: u64,
    pub element_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub properties: Properties,
}

impl NewElement {
    pub fn new(
        project_id: u64,
        element_id: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            project_id,
            element_id: element_id.into(),
            kind: kind.into(),
            name: name.into(),
            x,
            y,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Materializes the draft as an element with the given store id. Used to
    /// run element modules over a draft before it is stored.
    pub fn to_element(&self, id: u64) -> Element {
        Element {
            id,
            project_id: self.project_id,
            element_id: self.element_id.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
            x: self.x,
            y: self.y,
            properties: self.properties.clone(),
        }
    }
}

impl From<Element> for NewElement {
    fn from(element: Element) -> Self {
        Self {
            project_id: element.project_id,
            element_id: element.element_id,
            kind: element.kind,
            name: element.name,
            x: element.x,
            y: element.y,
            properties: element.properties,
        }
    }
}

/// Partial element update. The element kind is fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementUpdate {
    pub element_id: Option<String>,
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub properties: Option<Properties>,
}

impl ElementUpdate {
    pub(crate) fn apply(self, element: &mut Element) {
        if let Some(element_id) = self.element_id {
            element.element_id = element_id;
        }
        if let Some(name) = self.name {
            element.name = name;
        }
        if let Some(x) = self.x {
            element.x = x;
        }
        if let Some(y) = self.y {
            element.y = y;
        }
        if let Some(properties) = self.properties {
            element.properties = properties;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPanelElement {
    pub project_id: u64,
    pub element_id: u64,
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelElementUpdate {
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl PanelElementUpdate {
    pub(crate) fn apply(self, panel: &mut PanelElement) {
        if let Some(x) = self.position_x {
            panel.position_x = x;
        }
        if let Some(y) = self.position_y {
            panel.position_y = y;
        }
        if let Some(width) = self.width {
            panel.width = width;
        }
        if let Some(height) = self.height {
            panel.height = height;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConnection {
    pub project_id: u64,
    pub from_element_id: u64,
    pub to_element_id: u64,
    pub cable_section: f64,
    pub wire_count: u32,
    #[serde(default)]
    pub length: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionUpdate {
    pub cable_section: Option<f64>,
    pub wire_count: Option<u32>,
    pub length: Option<f64>,
}

impl ConnectionUpdate {
    pub(crate) fn apply(self, connection: &mut Connection) {
        if let Some(section) = self.cable_section {
            connection.cable_section = section;
        }
        if let Some(count) = self.wire_count {
            connection.wire_count = count;
        }
        if let Some(length) = self.length {
            connection.length = Some(length);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn element_kind_serializes_as_type() {
        let element = NewElement::new(1, "S1", "socket", "Kitchen socket", 10.0, 20.0)
            .with_property("power", 2000)
            .to_element(7);
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["type"], "socket");
        assert_eq!(json["properties"]["power"], 2000);
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn new_project_defaults_scale() {
        let draft: NewProject = serde_json::from_str(r#"{"name": "Flat"}"#).unwrap();
        assert_eq!(draft.scale, 1.0);
    }

    #[test]
    fn partial_update_keeps_unset_fields() {
        let mut element = NewElement::new(1, "L1", "lamp", "Hall", 1.0, 2.0).to_element(3);
        ElementUpdate {
            x: Some(5.0),
            ..Default::default()
        }
        .apply(&mut element);
        assert_eq!(element.x, 5.0);
        assert_eq!(element.y, 2.0);
        assert_eq!(element.name, "Hall");
    }
}
