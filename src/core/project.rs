/// The project store: compiled experiences, variables and the data table.
///
/// Loaded once from the authoring tool's JSON export, then mutated only
/// through variable writes and assignments.
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rustc_hash::FxHashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::routing;
use crate::core::variables::VariableTable;
use crate::schema::document::{DataTableItem, ExperienceData, ProjectDocument, Variable};
use crate::schema::expression::{Assignment, Comparison};
use crate::schema::node::{ConditionalRoute, Node, NodeId, NodeKind, WeightedRoute};

/// Default number of transient nodes one `advance` may pass through.
pub const DEFAULT_MAX_TRANSIENT_STEPS: usize = 10_000;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("duplicate variable name '{0}'")]
    DuplicateVariable(String),
    #[error("duplicate experience name '{0}'")]
    DuplicateExperience(String),
    #[error("duplicate node id {id} in experience '{experience}'")]
    DuplicateNodeId { experience: String, id: NodeId },
    #[error("variable not found: '{0}'")]
    UnknownVariable(String),
    #[error("data table item not found: '{0}'")]
    UnknownDataTableItem(String),
    #[error("experience not found: '{0}'")]
    UnknownExperience(String),
    #[error("invalid operator '{operator}': {reason}")]
    InvalidOperator {
        operator: String,
        reason: &'static str,
    },
    #[error("no probability route has a usable weight")]
    NoValidRoute,
}

/// One experience's node graph with an id index.
#[derive(Debug, Clone)]
pub struct ExperienceGraph {
    name: String,
    nodes: Vec<Node>,
    index: FxHashMap<NodeId, usize>,
}

impl ExperienceGraph {
    fn new(data: ExperienceData) -> Result<Self, ProjectError> {
        let mut index = FxHashMap::default();
        for (i, node) in data.node_list.iter().enumerate() {
            if index.insert(node.id, i).is_some() {
                return Err(ProjectError::DuplicateNodeId {
                    experience: data.name,
                    id: node.id,
                });
            }
        }
        Ok(Self {
            name: data.name,
            nodes: data.node_list,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes in document order, with their authored (unsubstituted) text.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    /// The first `start` node with the given name.
    pub fn start_node(&self, name: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| matches!(&n.kind, NodeKind::Start { name: start, .. } if start == name))
    }

    pub fn start_node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Start { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }
}

/// The loaded project. One instance holds the variable state of one
/// playthrough; independent playthroughs need independent projects.
pub struct Project {
    experiences: Vec<ExperienceGraph>,
    experience_index: FxHashMap<String, usize>,
    variables: VariableTable,
    data_table: Vec<DataTableItem>,
    rng: Box<dyn RngCore + Send>,
    max_transient_steps: usize,
}

/// Builder for constructing a `Project`.
pub struct ProjectBuilder {
    seed: Option<u64>,
    rng: Option<Box<dyn RngCore + Send>>,
    max_transient_steps: usize,
}

impl Project {
    pub fn builder() -> ProjectBuilder {
        ProjectBuilder {
            seed: None,
            rng: None,
            max_transient_steps: DEFAULT_MAX_TRANSIENT_STEPS,
        }
    }

    /// Load a project from the exported JSON text with default settings.
    pub fn from_json(text: &str) -> Result<Project, ProjectError> {
        Self::builder().build_from_json(text)
    }

    pub fn experience_names(&self) -> impl Iterator<Item = &str> {
        self.experiences.iter().map(|e| e.name())
    }

    pub fn experiences(&self) -> &[ExperienceGraph] {
        &self.experiences
    }

    pub fn experience(&self, name: &str) -> Result<&ExperienceGraph, ProjectError> {
        self.experience_position(name).map(|i| &self.experiences[i])
    }

    pub(crate) fn experience_position(&self, name: &str) -> Result<usize, ProjectError> {
        match self.experience_index.get(name) {
            Some(&i) => Ok(i),
            None => {
                warn!(experience = name, "experience not found");
                Err(ProjectError::UnknownExperience(name.to_string()))
            }
        }
    }

    pub(crate) fn experience_at(&self, position: usize) -> &ExperienceGraph {
        &self.experiences[position]
    }

    /// Variables in document order with their current values.
    pub fn variables(&self) -> &[Variable] {
        self.variables.as_slice()
    }

    pub fn variable_table(&self) -> &VariableTable {
        &self.variables
    }

    pub fn get_variable_value(&self, name: &str) -> Result<&str, ProjectError> {
        self.variables.get(name)
    }

    pub fn set_variable_value(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), ProjectError> {
        self.variables.set(name, value)
    }

    /// Restore every variable to its loaded value.
    pub fn reset_variables(&mut self) {
        debug!("variables reset");
        self.variables.reset();
    }

    /// Substitute variable names in `text` with their current values.
    pub fn substitute(&self, text: &str) -> String {
        self.variables.substitute(text)
    }

    pub fn data_table(&self) -> &[DataTableItem] {
        &self.data_table
    }

    /// Resolve a data table entry through variable substitution.
    pub fn get_data_table_value(&self, name: &str) -> Result<String, ProjectError> {
        match self.data_table.iter().find(|item| item.name == name) {
            Some(item) => Ok(self.variables.substitute(&item.value)),
            None => {
                warn!(item = name, "data table item not found");
                Err(ProjectError::UnknownDataTableItem(name.to_string()))
            }
        }
    }

    pub fn process_assignment(&mut self, assignment: &Assignment) -> Result<(), ProjectError> {
        self.variables.process_assignment(assignment)
    }

    pub fn evaluate_comparison(&self, comparison: &Comparison) -> Result<bool, ProjectError> {
        self.variables.evaluate_comparison(comparison)
    }

    /// Pick a conditional target; the last matching route wins.
    pub fn resolve_conditional(
        &self,
        routes: &[ConditionalRoute],
        default: Option<NodeId>,
    ) -> Option<NodeId> {
        routing::resolve_conditional(&self.variables, routes, default)
    }

    /// Draw a probability route using the project's random source.
    pub fn select_weighted_route(
        &mut self,
        routes: &[WeightedRoute],
    ) -> Result<NodeId, ProjectError> {
        routing::select_weighted_route(&self.variables, routes, &mut *self.rng)
    }

    pub fn max_transient_steps(&self) -> usize {
        self.max_transient_steps
    }
}

impl ProjectBuilder {
    /// Seed the random source used by probability nodes.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Provide the random source directly (overrides `seed`).
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Limit on transient nodes visited by a single `advance`.
    pub fn max_transient_steps(mut self, steps: usize) -> Self {
        self.max_transient_steps = steps;
        self
    }

    pub fn build_from_json(self, text: &str) -> Result<Project, ProjectError> {
        let document: ProjectDocument = serde_json::from_str(text)?;
        self.build(document)
    }

    pub fn build_from_path(self, path: &Path) -> Result<Project, ProjectError> {
        let contents = std::fs::read_to_string(path)?;
        self.build_from_json(&contents)
    }

    pub fn build(self, document: ProjectDocument) -> Result<Project, ProjectError> {
        let mut experiences = Vec::with_capacity(document.experiences.len());
        let mut experience_index = FxHashMap::default();
        for data in document.experiences {
            if experience_index
                .insert(data.name.clone(), experiences.len())
                .is_some()
            {
                return Err(ProjectError::DuplicateExperience(data.name));
            }
            experiences.push(ExperienceGraph::new(data)?);
        }
        let variables = VariableTable::new(document.variables)?;

        let rng: Box<dyn RngCore + Send> = match (self.rng, self.seed) {
            (Some(rng), _) => rng,
            (None, Some(seed)) => Box::new(StdRng::seed_from_u64(seed)),
            (None, None) => Box::new(StdRng::from_entropy()),
        };

        debug!(
            experiences = experiences.len(),
            variables = variables.len(),
            data_table = document.data_table.len(),
            "project loaded"
        );

        Ok(Project {
            experiences,
            experience_index,
            variables,
            data_table: document.data_table,
            rng,
            max_transient_steps: self.max_transient_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "experiences": [
            {"name": "Intro", "nodeList": [
                {"id": 1, "type": "start", "name": "Begin", "linksTo": 2},
                {"id": 2, "type": "end"}
            ]},
            {"name": "Town", "nodeList": [
                {"id": 1, "type": "start", "name": "Gate", "linksTo": 2},
                {"id": 2, "type": "start", "name": "Square", "linksTo": 3},
                {"id": 3, "type": "end"}
            ]}
        ],
        "variables": [{"name": "$name", "value": "Ava"}, {"name": "$gold", "value": "3"}],
        "dataTable": [{"name": "greeting", "value": "Hello $name, you have $gold gold."}]
    }"#;

    #[test]
    fn loads_experiences_in_order() {
        let project = Project::from_json(SMALL).unwrap();
        let names: Vec<&str> = project.experience_names().collect();
        assert_eq!(names, vec!["Intro", "Town"]);
        let town = project.experience("Town").unwrap();
        assert_eq!(town.nodes().len(), 3);
        assert_eq!(town.start_node("Square").map(|n| n.id), Some(NodeId(2)));
        assert_eq!(town.start_node_names().collect::<Vec<_>>(), vec!["Gate", "Square"]);
    }

    #[test]
    fn unknown_experience() {
        let project = Project::from_json(SMALL).unwrap();
        assert!(matches!(
            project.experience("Castle"),
            Err(ProjectError::UnknownExperience(name)) if name == "Castle"
        ));
    }

    #[test]
    fn data_table_is_substituted_on_read() {
        let mut project = Project::from_json(SMALL).unwrap();
        assert_eq!(
            project.get_data_table_value("greeting").unwrap(),
            "Hello Ava, you have 3 gold."
        );
        project.set_variable_value("$gold", "10").unwrap();
        assert_eq!(
            project.get_data_table_value("greeting").unwrap(),
            "Hello Ava, you have 10 gold."
        );
        assert_eq!(project.data_table()[0].value, "Hello $name, you have $gold gold.");
        assert!(matches!(
            project.get_data_table_value("farewell"),
            Err(ProjectError::UnknownDataTableItem(_))
        ));
    }

    #[test]
    fn reset_variables_restores_loaded_state() {
        let mut project = Project::from_json(SMALL).unwrap();
        project.set_variable_value("$name", "Bo").unwrap();
        project.reset_variables();
        assert_eq!(project.get_variable_value("$name").unwrap(), "Ava");
    }

    #[test]
    fn malformed_json_fails() {
        assert!(matches!(
            Project::from_json("{not json"),
            Err(ProjectError::Json(_))
        ));
    }

    #[test]
    fn missing_node_field_fails_whole_load() {
        let text = r#"{
            "experiences": [{"name": "A", "nodeList": [
                {"id": 1, "type": "start", "name": "S", "linksTo": 2},
                {"id": 2, "type": "choice"}
            ]}],
            "variables": [], "dataTable": []
        }"#;
        assert!(matches!(Project::from_json(text), Err(ProjectError::Json(_))));
    }

    #[test]
    fn duplicate_node_id_fails() {
        let text = r#"{
            "experiences": [{"name": "A", "nodeList": [
                {"id": 1, "type": "start", "name": "S"},
                {"id": 1, "type": "end"}
            ]}],
            "variables": [], "dataTable": []
        }"#;
        assert!(matches!(
            Project::from_json(text),
            Err(ProjectError::DuplicateNodeId { id: NodeId(1), .. })
        ));
    }

    #[test]
    fn duplicate_experience_fails() {
        let text = r#"{
            "experiences": [{"name": "A", "nodeList": []}, {"name": "A", "nodeList": []}],
            "variables": [], "dataTable": []
        }"#;
        assert!(matches!(
            Project::from_json(text),
            Err(ProjectError::DuplicateExperience(_))
        ));
    }

    #[test]
    fn builder_settings() {
        let project = Project::builder()
            .seed(12345)
            .max_transient_steps(50)
            .build_from_json(SMALL)
            .unwrap();
        assert_eq!(project.max_transient_steps(), 50);
        assert_eq!(
            Project::from_json(SMALL).unwrap().max_transient_steps(),
            DEFAULT_MAX_TRANSIENT_STEPS
        );
    }

    #[test]
    fn same_seed_same_draws() {
        let routes: Vec<WeightedRoute> = (0..5)
            .map(|i| WeightedRoute {
                weight: "1".to_string(),
                links_to: NodeId(i),
            })
            .collect();
        let mut a = Project::builder().seed(9).build_from_json(SMALL).unwrap();
        let mut b = Project::builder().seed(9).build_from_json(SMALL).unwrap();
        for _ in 0..20 {
            assert_eq!(
                a.select_weighted_route(&routes).unwrap(),
                b.select_weighted_route(&routes).unwrap()
            );
        }
    }
}
