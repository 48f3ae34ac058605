mod config;
mod dispatch;

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use wiring_module_host::management::{self, ModuleView};
use wiring_module_host::{
    default_unit_name, persist_enabled, write_stock_manifests, LoadFailure, ModuleRegistry,
};
use wiring_module_sdk::Capability;
use wiring_modules::stock_catalog;
use wiring_project::{
    ElementUpdate, Layer, NewConnection, NewElement, NewPanelElement, NewProject, ProjectStore,
    ProjectUpdate, DEFAULT_PAGE_LIMIT,
};

use crate::config::WiringConfig;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config =
        WiringConfig::load(cli.config.as_deref())?.with_overrides(cli.modules_dir, cli.store);

    let registry = ModuleRegistry::new(config.discovery(), stock_catalog()?);
    let report = registry.discover_and_load_all();
    if !report.is_complete() {
        eprintln!(
            "{} module(s) failed to load; run with RUST_LOG=warn for details",
            report.failures.len()
        );
    }

    let store = ProjectStore::open(&config.store_path)
        .with_context(|| format!("failed to open project store {}", config.store_path.display()))?;

    let result = run(cli.command, &config, &registry, &store);
    registry.shutdown();
    result
}

#[derive(Parser)]
#[command(name = "wiring", author, version, about = "Electrical wiring design backend")]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the directory scanned for module manifests.
    #[arg(long, global = true)]
    modules_dir: Option<PathBuf>,
    /// Override the project store file.
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and manage loaded modules.
    #[command(subcommand)]
    Modules(ModulesCommand),
    #[command(subcommand)]
    Project(ProjectCommand),
    #[command(subcommand)]
    Element(ElementCommand),
    /// Manage the electrical panel layout.
    #[command(subcommand)]
    Panel(PanelCommand),
    /// Connect two elements with a cable.
    Connect(ConnectArgs),
    #[command(subcommand)]
    Connection(ConnectionCommand),
    /// Export a project through an export module.
    Export(ExportArgs),
    /// Cable calculations without touching the store.
    #[command(subcommand)]
    Cable(CableCommand),
}

#[derive(Subcommand)]
enum ModulesCommand {
    /// Write default manifests for the stock modules.
    Init,
    List {
        /// Only list modules implementing this capability.
        #[arg(long)]
        capability: Option<Capability>,
    },
    Show { name: String },
    Reload { name: String },
    Enable { name: String },
    Disable { name: String },
}

#[derive(Subcommand)]
enum ProjectCommand {
    Create {
        name: String,
        /// Drawing scale of the floor plan.
        #[arg(long)]
        scale: Option<f64>,
    },
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: usize,
    },
    /// Print a project with all of its records.
    Show { id: u64 },
    Update(ProjectUpdateArgs),
    Delete { id: u64 },
}

#[derive(Args)]
struct ProjectUpdateArgs {
    id: u64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    scale: Option<f64>,
    #[arg(long)]
    floor_plan_image: Option<String>,
    #[arg(long)]
    floor_plan_svg: Option<String>,
    #[arg(long)]
    floor_plan_locked: Option<bool>,
    #[arg(long)]
    elements_locked: Option<bool>,
    #[arg(long, value_enum)]
    layer: Option<LayerArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayerArg {
    Plan,
    Elements,
}

impl From<LayerArg> for Layer {
    fn from(layer: LayerArg) -> Self {
        match layer {
            LayerArg::Plan => Layer::Plan,
            LayerArg::Elements => Layer::Elements,
        }
    }
}

#[derive(Subcommand)]
enum ElementCommand {
    Add(ElementAddArgs),
    List {
        #[arg(long)]
        project: u64,
    },
    /// Move an element on the floor plan.
    Move {
        id: u64,
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
    },
    Delete { id: u64 },
}

#[derive(Args)]
struct ElementAddArgs {
    #[arg(long)]
    project: u64,
    /// User-facing identifier such as `S1`.
    #[arg(long = "id")]
    element_id: String,
    #[arg(long = "type")]
    kind: String,
    #[arg(long)]
    name: String,
    #[arg(long, allow_hyphen_values = true)]
    x: f64,
    #[arg(long, allow_hyphen_values = true)]
    y: f64,
    /// Extra property as `key=value`; the value is parsed as JSON when
    /// possible.
    #[arg(long = "prop", value_parser = parse_property)]
    properties: Vec<(String, Value)>,
}

fn parse_property(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty property name in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[derive(Subcommand)]
enum PanelCommand {
    /// Place an element on the panel.
    Place {
        #[arg(long)]
        project: u64,
        #[arg(long)]
        element: u64,
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 0.0)]
        y: f64,
        #[arg(long, default_value_t = 18.0)]
        width: f64,
        #[arg(long, default_value_t = 90.0)]
        height: f64,
    },
    List {
        #[arg(long)]
        project: u64,
    },
    Delete { id: u64 },
}

#[derive(Args)]
struct ConnectArgs {
    #[arg(long)]
    project: u64,
    #[arg(long)]
    from: u64,
    #[arg(long)]
    to: u64,
    /// Conductor section in mm². Suggested from `--power` when omitted.
    #[arg(long)]
    section: Option<f64>,
    /// Load in watts used to suggest a section.
    #[arg(long)]
    power: Option<f64>,
    #[arg(long, default_value_t = 3)]
    wires: u32,
    /// Cable length in metres. Calculated from the floor plan when omitted.
    #[arg(long)]
    length: Option<f64>,
}

#[derive(Subcommand)]
enum ConnectionCommand {
    List {
        #[arg(long)]
        project: u64,
    },
    Delete { id: u64 },
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long)]
    project: u64,
    #[arg(long, default_value = "csv")]
    format: String,
    #[arg(long)]
    output: PathBuf,
}

#[derive(Subcommand)]
enum CableCommand {
    /// Cable length between two stored elements, in metres.
    Length {
        #[arg(long)]
        from: u64,
        #[arg(long)]
        to: u64,
    },
    /// Suggested conductor section for a load over a distance.
    Section {
        #[arg(long)]
        power: f64,
        #[arg(long)]
        distance: f64,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(
    command: Commands,
    config: &WiringConfig,
    registry: &ModuleRegistry,
    store: &ProjectStore,
) -> Result<()> {
    match command {
        Commands::Modules(command) => run_modules(command, config, registry),
        Commands::Project(command) => run_project(command, store),
        Commands::Element(command) => run_element(command, registry, store),
        Commands::Panel(command) => run_panel(command, store),
        Commands::Connect(args) => run_connect(args, registry, store),
        Commands::Connection(command) => run_connection(command, store),
        Commands::Export(args) => run_export(args, registry, store),
        Commands::Cable(command) => run_cable(command, registry, store),
    }
}

fn run_modules(
    command: ModulesCommand,
    config: &WiringConfig,
    registry: &ModuleRegistry,
) -> Result<()> {
    match command {
        ModulesCommand::Init => {
            let written = write_stock_manifests(&config.modules_dir, registry.catalog())?;
            if written.is_empty() {
                println!("All stock manifests already present in {}", config.modules_dir.display());
            }
            for path in written {
                println!("Wrote {}", path.display());
            }
            let failures = load_stock_units(registry);
            if !failures.is_empty() {
                let details: Vec<_> = failures
                    .iter()
                    .map(|failure| format!("{}: {}", failure.name, failure.error))
                    .collect();
                bail!(
                    "{} module(s) failed to load:\n{}",
                    failures.len(),
                    details.join("\n")
                );
            }
        }
        ModulesCommand::List { capability } => {
            let mut views = management::list_modules(registry);
            if let Some(capability) = capability {
                let matching: Vec<_> = registry
                    .filter_by_capability(capability)
                    .iter()
                    .map(|entry| entry.name().to_string())
                    .collect();
                views.retain(|view| matching.contains(&view.name));
            }
            if views.is_empty() {
                println!("No modules loaded from {}", config.modules_dir.display());
            }
            for ModuleView { name, info, enabled } in views {
                let state = if enabled { "enabled" } else { "disabled" };
                println!("{name} {} ({}, {state})", info.version, info.capability);
            }
        }
        ModulesCommand::Show { name } => print_json(&management::module_view(registry, &name)?)?,
        ModulesCommand::Reload { name } => {
            println!("{}", management::reload_module(registry, &name)?.message);
        }
        ModulesCommand::Enable { name } => set_enabled(config, registry, &name, true)?,
        ModulesCommand::Disable { name } => set_enabled(config, registry, &name, false)?,
    }
    Ok(())
}

/// Loads the default unit of every catalog factory that is not registered
/// yet. A failing unit does not stop the others.
fn load_stock_units(registry: &ModuleRegistry) -> Vec<LoadFailure> {
    let mut failures = Vec::new();
    for factory in registry.catalog().iter() {
        let name = default_unit_name(factory.id());
        if registry.contains(name) {
            continue;
        }
        if let Err(error) = registry.load(name) {
            tracing::warn!(module = name, %error, "failed to load module");
            failures.push(LoadFailure {
                name: name.to_string(),
                error,
            });
        }
    }
    failures
}

fn set_enabled(
    config: &WiringConfig,
    registry: &ModuleRegistry,
    name: &str,
    enabled: bool,
) -> Result<()> {
    let ack = management::set_module_enabled(registry, name, enabled)?;
    persist_enabled(&config.discovery(), name, enabled)
        .with_context(|| format!("failed to persist enabled flag for `{name}`"))?;
    println!("{}", ack.message);
    Ok(())
}

fn run_project(command: ProjectCommand, store: &ProjectStore) -> Result<()> {
    match command {
        ProjectCommand::Create { name, scale } => {
            let mut draft = NewProject::new(name);
            if let Some(scale) = scale {
                draft = draft.with_scale(scale);
            }
            print_json(&store.create_project(draft)?)?;
        }
        ProjectCommand::List { skip, limit } => {
            for project in store.projects(skip, limit) {
                println!(
                    "{} {} (created {})",
                    project.id,
                    project.name,
                    project.created_at.to_rfc3339()
                );
            }
        }
        ProjectCommand::Show { id } => print_json(&store.bundle(id)?)?,
        ProjectCommand::Update(args) => {
            let update = ProjectUpdate {
                name: args.name,
                scale: args.scale,
                floor_plan_image: args.floor_plan_image,
                floor_plan_svg: args.floor_plan_svg,
                floor_plan_locked: args.floor_plan_locked,
                elements_locked: args.elements_locked,
                active_layer: args.layer.map(Layer::from),
            };
            print_json(&store.update_project(args.id, update)?)?;
        }
        ProjectCommand::Delete { id } => {
            store.delete_project(id)?;
            println!("Project {id} deleted");
        }
    }
    Ok(())
}

fn run_element(
    command: ElementCommand,
    registry: &ModuleRegistry,
    store: &ProjectStore,
) -> Result<()> {
    match command {
        ElementCommand::Add(args) => {
            let mut draft = NewElement::new(
                args.project,
                args.element_id,
                args.kind,
                args.name,
                args.x,
                args.y,
            );
            for (key, value) in args.properties {
                draft = draft.with_property(key, value);
            }
            let draft = dispatch::prepare_element(registry, draft)?;
            print_json(&store.create_element(draft)?)?;
        }
        ElementCommand::List { project } => {
            store.project(project)?;
            for element in store.elements_by_project(project) {
                println!(
                    "{} {} {} \"{}\" at ({:.1}, {:.1})",
                    element.id, element.element_id, element.kind, element.name, element.x, element.y
                );
            }
        }
        ElementCommand::Move { id, x, y } => {
            let update = ElementUpdate {
                x: Some(x),
                y: Some(y),
                ..Default::default()
            };
            print_json(&store.update_element(id, update)?)?;
        }
        ElementCommand::Delete { id } => {
            store.delete_element(id)?;
            println!("Element {id} deleted");
        }
    }
    Ok(())
}

fn run_panel(command: PanelCommand, store: &ProjectStore) -> Result<()> {
    match command {
        PanelCommand::Place {
            project,
            element,
            x,
            y,
            width,
            height,
        } => {
            let placed = store.create_panel_element(NewPanelElement {
                project_id: project,
                element_id: element,
                position_x: x,
                position_y: y,
                width,
                height,
            })?;
            print_json(&placed)?;
        }
        PanelCommand::List { project } => {
            store.project(project)?;
            print_json(&store.panel_elements_by_project(project))?;
        }
        PanelCommand::Delete { id } => {
            store.delete_panel_element(id)?;
            println!("Panel element {id} deleted");
        }
    }
    Ok(())
}

fn run_connect(args: ConnectArgs, registry: &ModuleRegistry, store: &ProjectStore) -> Result<()> {
    let from = store.element(args.from)?;
    let to = store.element(args.to)?;
    let length = args
        .length
        .or_else(|| dispatch::cable_length(registry, &from, &to));

    let cable_section = match (args.section, args.power) {
        (Some(section), _) => section,
        (None, Some(power)) => dispatch::suggest_section(registry, power, length.unwrap_or(0.0))
            .context("no enabled connection module to suggest a cable section")?,
        (None, None) => bail!("either --section or --power is required"),
    };

    let connection = store.create_connection(NewConnection {
        project_id: args.project,
        from_element_id: from.id,
        to_element_id: to.id,
        cable_section,
        wire_count: args.wires,
        length,
    })?;
    print_json(&connection)
}

fn run_connection(command: ConnectionCommand, store: &ProjectStore) -> Result<()> {
    match command {
        ConnectionCommand::List { project } => {
            let bundle = store.bundle(project)?;
            for connection in &bundle.connections {
                let length = connection
                    .length
                    .map(|length| format!("{length:.2} m"))
                    .unwrap_or_else(|| "unknown length".into());
                println!(
                    "{} {} -> {} {:.2} mm² x{} ({length})",
                    connection.id,
                    bundle.element_label(connection.from_element_id),
                    bundle.element_label(connection.to_element_id),
                    connection.cable_section,
                    connection.wire_count,
                );
            }
        }
        ConnectionCommand::Delete { id } => {
            store.delete_connection(id)?;
            println!("Connection {id} deleted");
        }
    }
    Ok(())
}

fn run_export(args: ExportArgs, registry: &ModuleRegistry, store: &ProjectStore) -> Result<()> {
    let bundle = store.bundle(args.project)?;
    let bytes = dispatch::export_project(registry, &bundle, &args.format)?;
    fs::write(&args.output, &bytes)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    tracing::info!(
        project = args.project,
        format = %args.format,
        bytes = bytes.len(),
        "project exported"
    );
    println!("Exported project {} to {}", args.project, args.output.display());
    Ok(())
}

fn run_cable(command: CableCommand, registry: &ModuleRegistry, store: &ProjectStore) -> Result<()> {
    match command {
        CableCommand::Length { from, to } => {
            let from = store.element(from)?;
            let to = store.element(to)?;
            let length = dispatch::cable_length(registry, &from, &to)
                .context("no enabled connection module")?;
            println!("{length:.2}");
        }
        CableCommand::Section { power, distance } => {
            let section = dispatch::suggest_section(registry, power, distance)
                .context("no enabled connection module")?;
            println!("{section}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;
    use wiring_module_host::{DiscoveryConfig, ModuleManifest};
    use wiring_modules::EUCLIDEAN_CONNECTION_ID;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn properties_parse_as_json_or_text() {
        assert_eq!(parse_property("power=2000").unwrap(), ("power".into(), json!(2000)));
        assert_eq!(parse_property("room=kitchen").unwrap(), ("room".into(), json!("kitchen")));
        assert!(parse_property("novalue").is_err());
        assert!(parse_property("=1").is_err());
    }

    #[test]
    fn capability_filter_accepts_aliases() {
        let cli = Cli::try_parse_from(["wiring", "modules", "list", "--capability", "exporter"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Modules(ModulesCommand::List {
                capability: Some(Capability::Export)
            })
        ));
        assert!(Cli::try_parse_from(["wiring", "modules", "list", "--capability", "x"]).is_err());
    }

    #[test]
    fn stock_unit_failures_do_not_stop_the_rest() {
        let dir = tempdir().unwrap();
        let config = DiscoveryConfig::new(dir.path());
        ModuleManifest::new(EUCLIDEAN_CONNECTION_ID)
            .with_settings(json!({"scale": -1}))
            .write(&config.manifest_path("euclidean_connection"))
            .unwrap();
        let catalog = stock_catalog().unwrap();
        write_stock_manifests(dir.path(), &catalog).unwrap();
        let registry = ModuleRegistry::new(config, catalog);

        let failures = load_stock_units(&registry);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "euclidean_connection");
        assert!(registry.contains("element_normalizer"));
        assert!(registry.contains("tabular_exporter"));
        assert_eq!(load_stock_units(&registry).len(), 1);
    }

    #[test]
    fn global_overrides_are_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["wiring", "modules", "list", "--store", "s.json"]).unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("s.json")));
        assert!(matches!(
            cli.command,
            Commands::Modules(ModulesCommand::List { capability: None })
        ));
    }
}
