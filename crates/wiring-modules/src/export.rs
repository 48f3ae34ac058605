use csv::WriterBuilder;
use wiring_module_sdk::prelude::*;

pub const TABULAR_EXPORTER_ID: &str = "wiring.tabular_exporter";

const FORMATS: &[&str] = &["csv", "json"];

/// Exports a project as CSV sheets or as a JSON document.
#[derive(Debug, Clone, Default)]
pub struct TabularExporter;

fn info() -> ModuleInfo {
    ModuleInfo::new("Tabular Exporter", Capability::Export)
        .with_description("Exports elements, connections and panel layout as CSV or JSON")
        .with_author("System")
}

fn csv_error(err: impl std::fmt::Display) -> ExportError {
    ExportError::Encode(err.to_string())
}

/// Writes the element, connection and panel sheets one after another, each
/// introduced by a single-cell title row.
fn export_csv(project: &ProjectBundle) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(["Elements"]).map_err(csv_error)?;
    writer
        .write_record(["ID", "Type", "Name", "X", "Y", "Properties"])
        .map_err(csv_error)?;
    for element in &project.elements {
        let properties = serde_json::to_string(&element.properties)?;
        writer
            .write_record([
                element.element_id.clone(),
                element.kind.clone(),
                element.name.clone(),
                format!("{:.2}", element.x),
                format!("{:.2}", element.y),
                properties,
            ])
            .map_err(csv_error)?;
    }

    writer.write_record(["Connections"]).map_err(csv_error)?;
    writer
        .write_record([
            "From element",
            "To element",
            "Section (mm²)",
            "Wire count",
            "Length (m)",
        ])
        .map_err(csv_error)?;
    for connection in &project.connections {
        let length = connection
            .length
            .map(|length| format!("{length:.2}"))
            .unwrap_or_default();
        writer
            .write_record([
                project.element_label(connection.from_element_id),
                project.element_label(connection.to_element_id),
                format!("{:.2}", connection.cable_section),
                connection.wire_count.to_string(),
                length,
            ])
            .map_err(csv_error)?;
    }

    writer.write_record(["Panel elements"]).map_err(csv_error)?;
    writer
        .write_record(["Element ID", "Position X", "Position Y", "Width", "Height"])
        .map_err(csv_error)?;
    for panel in &project.panel_elements {
        writer
            .write_record([
                project.element_label(panel.element_id),
                panel.position_x.to_string(),
                panel.position_y.to_string(),
                panel.width.to_string(),
                panel.height.to_string(),
            ])
            .map_err(csv_error)?;
    }

    writer.into_inner().map_err(csv_error)
}

impl WiringModule for TabularExporter {
    fn info(&self) -> ModuleInfo {
        info()
    }

    fn initialize(&mut self, _context: &ModuleContext) -> bool {
        true
    }

    fn as_export(&self) -> Option<&dyn ExportModule> {
        Some(self)
    }
}

impl ExportModule for TabularExporter {
    fn export(&self, project: &ProjectBundle, format: &str) -> Result<Vec<u8>, ExportError> {
        match format.to_ascii_lowercase().as_str() {
            "csv" => export_csv(project),
            "json" => Ok(serde_json::to_vec_pretty(project)?),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }

    fn supported_formats(&self) -> Vec<String> {
        FORMATS.iter().map(|format| format.to_string()).collect()
    }
}

pub struct TabularExporterFactory;

impl ModuleFactory for TabularExporterFactory {
    fn id(&self) -> &str {
        TABULAR_EXPORTER_ID
    }

    fn info(&self) -> ModuleInfo {
        info()
    }

    fn create(&self) -> Box<dyn WiringModule> {
        Box::new(TabularExporter)
    }
}
