use std::fmt;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    Connection, ConnectionUpdate, Element, ElementUpdate, Layer, NewConnection, NewElement,
    NewPanelElement, NewProject, PanelElement, PanelElementUpdate, Project, ProjectBundle,
    ProjectUpdate,
};

/// Default page size used when listing projects.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Project,
    Element,
    PanelElement,
    Connection,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Project => "project",
            RecordKind::Element => "element",
            RecordKind::PanelElement => "panel element",
            RecordKind::Connection => "connection",
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access project store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse project store: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: u64 },
    #[error("{0}")]
    Invalid(String),
}

impl StoreError {
    fn not_found(kind: RecordKind, id: u64) -> Self {
        StoreError::NotFound { kind, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Version tag stored alongside the serialized store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreVersion(pub u32);

impl Default for StoreVersion {
    fn default() -> Self {
        StoreVersion(2)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct IdCounters {
    project: u64,
    element: u64,
    panel_element: u64,
    connection: u64,
}

fn max_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0)
}

fn next_id(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default = "legacy_version")]
    version: StoreVersion,
    #[serde(default)]
    counters: IdCounters,
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    panel_elements: Vec<PanelElement>,
    #[serde(default)]
    connections: Vec<Connection>,
}

// Files written before the version tag existed had no id counters either.
fn legacy_version() -> StoreVersion {
    StoreVersion(1)
}

impl StoreData {
    fn upgrade(&mut self) {
        if self.version.0 < 2 {
            let counters = &mut self.counters;
            counters.project = counters
                .project
                .max(max_id(self.projects.iter().map(|p| p.id)));
            counters.element = counters
                .element
                .max(max_id(self.elements.iter().map(|e| e.id)));
            counters.panel_element = counters
                .panel_element
                .max(max_id(self.panel_elements.iter().map(|p| p.id)));
            counters.connection = counters
                .connection
                .max(max_id(self.connections.iter().map(|c| c.id)));
        }
        self.version = StoreVersion::default();
    }

    fn project(&self, id: u64) -> Result<&Project, StoreError> {
        self.projects
            .iter()
            .find(|project| project.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Project, id))
    }

    fn element(&self, id: u64) -> Result<&Element, StoreError> {
        self.elements
            .iter()
            .find(|element| element.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Element, id))
    }

    fn element_in_project(&self, id: u64, project_id: u64) -> Result<&Element, StoreError> {
        let element = self.element(id)?;
        if element.project_id != project_id {
            return Err(StoreError::Invalid(format!(
                "element {id} belongs to project {}, not project {project_id}",
                element.project_id
            )));
        }
        Ok(element)
    }
}

/// JSON-file backed store for wiring projects.
///
/// Every mutation rewrites the whole file. A store opened with
/// [`ProjectStore::in_memory`] never touches the filesystem.
#[derive(Debug)]
pub struct ProjectStore {
    path: Option<PathBuf>,
    data: Mutex<StoreData>,
}

impl ProjectStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut data = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str::<StoreData>(&raw)?
        } else {
            StoreData {
                version: StoreVersion::default(),
                ..Default::default()
            }
        };
        data.upgrade();
        tracing::debug!(
            path = %path.display(),
            projects = data.projects.len(),
            "opened project store"
        );
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(StoreData {
                version: StoreVersion::default(),
                ..Default::default()
            }),
        }
    }

    // Projects

    pub fn create_project(&self, draft: NewProject) -> Result<Project, StoreError> {
        let project = self.transact(|data| {
            let project = Project {
                id: next_id(&mut data.counters.project),
                name: draft.name,
                created_at: Utc::now(),
                scale: draft.scale,
                floor_plan_image: None,
                floor_plan_svg: None,
                floor_plan_locked: false,
                elements_locked: false,
                active_layer: Layer::default(),
            };
            data.projects.push(project.clone());
            Ok(project)
        })?;
        tracing::info!(id = project.id, name = %project.name, "created project");
        Ok(project)
    }

    pub fn projects(&self, skip: usize, limit: usize) -> Vec<Project> {
        self.data
            .lock()
            .projects
            .iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn project(&self, id: u64) -> Result<Project, StoreError> {
        self.data.lock().project(id).cloned()
    }

    pub fn update_project(&self, id: u64, update: ProjectUpdate) -> Result<Project, StoreError> {
        self.transact(|data| {
            let project = data
                .projects
                .iter_mut()
                .find(|project| project.id == id)
                .ok_or_else(|| StoreError::not_found(RecordKind::Project, id))?;
            update.apply(project);
            Ok(project.clone())
        })
    }

    /// Deletes a project together with everything that belongs to it.
    pub fn delete_project(&self, id: u64) -> Result<(), StoreError> {
        self.transact(|data| {
            data.project(id)?;
            data.projects.retain(|project| project.id != id);
            data.elements.retain(|element| element.project_id != id);
            data.panel_elements.retain(|panel| panel.project_id != id);
            data.connections.retain(|connection| connection.project_id != id);
            Ok(())
        })?;
        tracing::info!(id, "deleted project");
        Ok(())
    }

    // Elements

    pub fn create_element(&self, draft: NewElement) -> Result<Element, StoreError> {
        self.transact(|data| {
            data.project(draft.project_id)?;
            let element = draft.to_element(next_id(&mut data.counters.element));
            data.elements.push(element.clone());
            Ok(element)
        })
    }

    pub fn elements_by_project(&self, project_id: u64) -> Vec<Element> {
        self.data
            .lock()
            .elements
            .iter()
            .filter(|element| element.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn element(&self, id: u64) -> Result<Element, StoreError> {
        self.data.lock().element(id).cloned()
    }

    pub fn update_element(&self, id: u64, update: ElementUpdate) -> Result<Element, StoreError> {
        self.transact(|data| {
            let element = data
                .elements
                .iter_mut()
                .find(|element| element.id == id)
                .ok_or_else(|| StoreError::not_found(RecordKind::Element, id))?;
            update.apply(element);
            Ok(element.clone())
        })
    }

    /// Deletes an element along with the connections and panel placements
    /// that reference it.
    pub fn delete_element(&self, id: u64) -> Result<(), StoreError> {
        self.transact(|data| {
            data.element(id)?;
            data.elements.retain(|element| element.id != id);
            data.panel_elements.retain(|panel| panel.element_id != id);
            data.connections.retain(|connection| {
                connection.from_element_id != id && connection.to_element_id != id
            });
            Ok(())
        })
    }

    // Panel elements

    pub fn create_panel_element(
        &self,
        draft: NewPanelElement,
    ) -> Result<PanelElement, StoreError> {
        self.transact(|data| {
            data.project(draft.project_id)?;
            data.element_in_project(draft.element_id, draft.project_id)?;
            let panel = PanelElement {
                id: next_id(&mut data.counters.panel_element),
                project_id: draft.project_id,
                element_id: draft.element_id,
                position_x: draft.position_x,
                position_y: draft.position_y,
                width: draft.width,
                height: draft.height,
            };
            data.panel_elements.push(panel.clone());
            Ok(panel)
        })
    }

    pub fn panel_elements_by_project(&self, project_id: u64) -> Vec<PanelElement> {
        self.data
            .lock()
            .panel_elements
            .iter()
            .filter(|panel| panel.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn panel_element(&self, id: u64) -> Result<PanelElement, StoreError> {
        self.data
            .lock()
            .panel_elements
            .iter()
            .find(|panel| panel.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(RecordKind::PanelElement, id))
    }

    pub fn update_panel_element(
        &self,
        id: u64,
        update: PanelElementUpdate,
    ) -> Result<PanelElement, StoreError> {
        self.transact(|data| {
            let panel = data
                .panel_elements
                .iter_mut()
                .find(|panel| panel.id == id)
                .ok_or_else(|| StoreError::not_found(RecordKind::PanelElement, id))?;
            update.apply(panel);
            Ok(panel.clone())
        })
    }

    pub fn delete_panel_element(&self, id: u64) -> Result<(), StoreError> {
        self.transact(|data| {
            let before = data.panel_elements.len();
            data.panel_elements.retain(|panel| panel.id != id);
            if data.panel_elements.len() == before {
                return Err(StoreError::not_found(RecordKind::PanelElement, id));
            }
            Ok(())
        })
    }

    // Connections

    pub fn create_connection(&self, draft: NewConnection) -> Result<Connection, StoreError> {
        self.transact(|data| {
            data.project(draft.project_id)?;
            data.element(draft.from_element_id)?;
            data.element(draft.to_element_id)?;
            data.element_in_project(draft.from_element_id, draft.project_id)?;
            data.element_in_project(draft.to_element_id, draft.project_id)?;
            let connection = Connection {
                id: next_id(&mut data.counters.connection),
                project_id: draft.project_id,
                from_element_id: draft.from_element_id,
                to_element_id: draft.to_element_id,
                cable_section: draft.cable_section,
                wire_count: draft.wire_count,
                length: draft.length,
            };
            data.connections.push(connection.clone());
            Ok(connection)
        })
    }

    pub fn connections_by_project(&self, project_id: u64) -> Vec<Connection> {
        self.data
            .lock()
            .connections
            .iter()
            .filter(|connection| connection.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn connection(&self, id: u64) -> Result<Connection, StoreError> {
        self.data
            .lock()
            .connections
            .iter()
            .find(|connection| connection.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(RecordKind::Connection, id))
    }

    pub fn update_connection(
        &self,
        id: u64,
        update: ConnectionUpdate,
    ) -> Result<Connection, StoreError> {
        self.transact(|data| {
            let connection = data
                .connections
                .iter_mut()
                .find(|connection| connection.id == id)
                .ok_or_else(|| StoreError::not_found(RecordKind::Connection, id))?;
            update.apply(connection);
            Ok(connection.clone())
        })
    }

    pub fn delete_connection(&self, id: u64) -> Result<(), StoreError> {
        self.transact(|data| {
            let before = data.connections.len();
            data.connections.retain(|connection| connection.id != id);
            if data.connections.len() == before {
                return Err(StoreError::not_found(RecordKind::Connection, id));
            }
            Ok(())
        })
    }

    /// Collects a project and all of its records.
    pub fn bundle(&self, project_id: u64) -> Result<ProjectBundle, StoreError> {
        let data = self.data.lock();
        let project = data.project(project_id)?.clone();
        Ok(ProjectBundle {
            project,
            elements: data
                .elements
                .iter()
                .filter(|element| element.project_id == project_id)
                .cloned()
                .collect(),
            connections: data
                .connections
                .iter()
                .filter(|connection| connection.project_id == project_id)
                .cloned()
                .collect(),
            panel_elements: data
                .panel_elements
                .iter()
                .filter(|panel| panel.project_id == project_id)
                .cloned()
                .collect(),
        })
    }

    /// Applies `change` to a copy of the data and swaps the copy in only
    /// once it has been persisted.
    fn transact<T>(
        &self,
        change: impl FnOnce(&mut StoreData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.data.lock();
        let mut draft = data.clone();
        let value = change(&mut draft)?;
        self.persist(&draft)?;
        *data = draft;
        Ok(value)
    }

    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(path, json)?;
        Ok(())
    }
}
