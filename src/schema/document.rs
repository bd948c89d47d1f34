use serde::{Deserialize, Serialize};

use super::node::Node;

/// A mutable project variable. Values are always text; numeric operators
/// parse them on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

/// A read-only templated string, resolved through variable substitution
/// whenever it is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTableItem {
    pub name: String,
    pub value: String,
}

/// One named node graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceData {
    pub name: String,
    pub node_list: Vec<Node>,
}

/// The compiled project document exactly as exported by the authoring tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub experiences: Vec<ExperienceData>,
    pub variables: Vec<Variable>,
    pub data_table: Vec<DataTableItem>,
}
