use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::expression::{Assignment, Comparison, RouteMode};

/// Newtype wrapper for node ids. Ids are unique within one experience only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A free-form `(name, value)` pair attached to a node. Values are
/// substitution-eligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

/// One selectable option of a `choice` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub choice_string: String,
    #[serde(default)]
    pub links_to: Option<NodeId>,
}

/// An outgoing edge of a `conditional` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRoute {
    pub comparisons: Vec<Comparison>,
    pub mode: RouteMode,
    pub links_to: NodeId,
}

/// An outgoing edge of a `probability` node. The weight is template text
/// and is only parsed as a number after substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedRoute {
    pub weight: String,
    pub links_to: NodeId,
}

/// A graph vertex. The `type` tag of the document selects the [`NodeKind`]
/// and only the fields valid for that kind are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Vec<Property>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    #[serde(rename_all = "camelCase")]
    Start {
        name: String,
        #[serde(default)]
        links_to: Option<NodeId>,
    },
    #[serde(rename_all = "camelCase")]
    Dialog {
        dialog_source: String,
        dialog_string: String,
        #[serde(default)]
        links_to: Option<NodeId>,
    },
    Choice { choices: Vec<Choice> },
    #[serde(rename_all = "camelCase")]
    Function {
        statement: String,
        #[serde(default)]
        links_to: Option<NodeId>,
    },
    End {},
    #[serde(rename_all = "camelCase")]
    Variable {
        assignments: Vec<Assignment>,
        #[serde(default)]
        links_to: Option<NodeId>,
    },
    #[serde(rename_all = "camelCase")]
    Conditional {
        routes: Vec<ConditionalRoute>,
        #[serde(default)]
        default_route_links_to: Option<NodeId>,
    },
    Probability { routes: Vec<WeightedRoute> },
    #[serde(rename_all = "camelCase")]
    Teleport {
        destination_experience: String,
        destination_start_node: String,
    },
}

impl NodeKind {
    /// The document tag for this kind, e.g. `"dialog"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Dialog { .. } => "dialog",
            Self::Choice { .. } => "choice",
            Self::Function { .. } => "function",
            Self::End {} => "end",
            Self::Variable { .. } => "variable",
            Self::Conditional { .. } => "conditional",
            Self::Probability { .. } => "probability",
            Self::Teleport { .. } => "teleport",
        }
    }

    /// Displayable kinds are handed to the host; all others are
    /// processed automatically during traversal.
    pub fn is_displayable(&self) -> bool {
        matches!(
            self,
            Self::Start { .. }
                | Self::Dialog { .. }
                | Self::Choice { .. }
                | Self::Function { .. }
                | Self::End {}
        )
    }
}

impl Node {
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn is_displayable(&self) -> bool {
        self.kind.is_displayable()
    }

    /// Look up a property value by name.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Every node id this node can transition to, in document order.
    /// Missing links are skipped.
    pub fn outgoing_links(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Start { links_to, .. }
            | NodeKind::Dialog { links_to, .. }
            | NodeKind::Function { links_to, .. }
            | NodeKind::Variable { links_to, .. } => links_to.iter().copied().collect(),
            NodeKind::Choice { choices } => choices.iter().filter_map(|c| c.links_to).collect(),
            NodeKind::Conditional {
                routes,
                default_route_links_to,
            } => routes
                .iter()
                .map(|r| r.links_to)
                .chain(default_route_links_to.iter().copied())
                .collect(),
            NodeKind::Probability { routes } => routes.iter().map(|r| r.links_to).collect(),
            NodeKind::End {} | NodeKind::Teleport { .. } => Vec::new(),
        }
    }
}

/// Treat an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
