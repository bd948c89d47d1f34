/// Experience traversal: walks one experience's node graph on behalf of
/// the host, collapsing transient nodes between displayable ones.
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::core::project::{ExperienceGraph, Project, ProjectError};
use crate::schema::node::{Node, NodeId, NodeKind};

#[derive(Debug, Error)]
pub enum TraversalError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("no current node")]
    NoCurrentNode,
    #[error("no start node named '{name}' in experience '{experience}'")]
    UnknownStartNode { experience: String, name: String },
    #[error("invalid or missing choice index {index:?} ({available} choices)")]
    InvalidChoiceIndex {
        index: Option<usize>,
        available: usize,
    },
    #[error("cannot advance from a '{0}' node")]
    InvalidNodeType(&'static str),
    #[error("the chain after node {0} ended without reaching a displayable node")]
    BrokenChain(NodeId),
    #[error("passed through more than {0} transient nodes in one step")]
    StepLimitExceeded(usize),
}

/// A cursor into one experience of a [`Project`].
///
/// Nodes handed back to the caller are copies with every template field
/// substituted against the current variable values; the stored templates
/// are never rewritten.
pub struct Experience<'p> {
    project: &'p mut Project,
    experience: usize,
    current: Option<NodeId>,
}

impl<'p> Experience<'p> {
    pub fn new(project: &'p mut Project, experience_name: &str) -> Result<Self, TraversalError> {
        let experience = project.experience_position(experience_name)?;
        Ok(Self {
            project,
            experience,
            current: None,
        })
    }

    pub fn project(&self) -> &Project {
        &*self.project
    }

    /// Mutable access to the underlying project, e.g. to set variables
    /// between steps.
    pub fn project_mut(&mut self) -> &mut Project {
        &mut *self.project
    }

    /// Name of the active experience. Changes when a teleport is taken.
    pub fn experience_name(&self) -> &str {
        self.graph().name()
    }

    fn graph(&self) -> &ExperienceGraph {
        self.project.experience_at(self.experience)
    }

    /// Fetch a node of the active experience by id, substituted.
    pub fn get_node(&self, id: NodeId) -> Option<Node> {
        self.graph().node(id).map(|node| self.resolve(node))
    }

    /// Position the cursor on the named start node and return it.
    pub fn get_start_node(&mut self, name: &str) -> Result<Node, TraversalError> {
        let id = self.find_start_node(name)?;
        self.current = Some(id);
        debug!(experience = self.experience_name(), start = name, "cursor placed on start node");
        self.get_node(id).ok_or(TraversalError::NoCurrentNode)
    }

    /// Switch to another experience and place the cursor on one of its
    /// start nodes. Nothing changes if either name is unknown.
    pub fn enter(&mut self, experience_name: &str, start: &str) -> Result<Node, TraversalError> {
        let position = self.project.experience_position(experience_name)?;
        let previous = std::mem::replace(&mut self.experience, position);
        match self.get_start_node(start) {
            Ok(node) => Ok(node),
            Err(e) => {
                self.experience = previous;
                Err(e)
            }
        }
    }

    /// The node under the cursor, substituted against current values.
    pub fn current_node(&self) -> Option<Node> {
        self.current.and_then(|id| self.get_node(id))
    }

    /// True when the cursor rests on an `end` node.
    pub fn is_finished(&self) -> bool {
        self.current
            .and_then(|id| self.graph().node(id))
            .is_some_and(|node| matches!(node.kind, NodeKind::End {}))
    }

    /// Move from the current node to the next displayable node.
    ///
    /// `choice` selects the option when the cursor is on a `choice` node
    /// and is ignored otherwise. Variable, conditional, probability and
    /// teleport nodes met on the way are processed within this call. If the
    /// chain runs into a missing node the cursor is cleared and
    /// [`TraversalError::BrokenChain`] is returned.
    pub fn advance(&mut self, choice: Option<usize>) -> Result<Node, TraversalError> {
        let Some(current_id) = self.current else {
            error!("advance called with no current node");
            return Err(TraversalError::NoCurrentNode);
        };
        let Some(current) = self.graph().node(current_id) else {
            self.current = None;
            error!(node = %current_id, "current node no longer resolves");
            return Err(TraversalError::BrokenChain(current_id));
        };

        let mut next = match &current.kind {
            NodeKind::Start { links_to, .. }
            | NodeKind::Dialog { links_to, .. }
            | NodeKind::Function { links_to, .. } => *links_to,
            NodeKind::Choice { choices } => match choice.and_then(|i| choices.get(i)) {
                Some(selected) => selected.links_to,
                None => {
                    error!(index = ?choice, available = choices.len(), "invalid or missing choice index");
                    return Err(TraversalError::InvalidChoiceIndex {
                        index: choice,
                        available: choices.len(),
                    });
                }
            },
            other => {
                error!(node_type = other.type_name(), "node type does not link onward");
                return Err(TraversalError::InvalidNodeType(other.type_name()));
            }
        };

        let limit = self.project.max_transient_steps();
        let mut steps = 0usize;
        let landed = loop {
            let Some(id) = next else {
                break None;
            };
            let Some(node) = self.graph().node(id).cloned() else {
                warn!(experience = self.experience_name(), node = %id, "node not found");
                break None;
            };
            if node.is_displayable() {
                break Some(node);
            }

            steps += 1;
            if steps > limit {
                self.current = None;
                error!(limit, "transient step limit exceeded");
                return Err(TraversalError::StepLimitExceeded(limit));
            }
            trace!(node = %node.id, node_type = node.type_name(), "processing transient node");

            next = match node.kind {
                NodeKind::Variable {
                    assignments,
                    links_to,
                } => {
                    for assignment in &assignments {
                        // Failures are reported by the store; the remaining
                        // assignments still run.
                        let _ = self.project.process_assignment(assignment);
                    }
                    links_to
                }
                NodeKind::Conditional {
                    routes,
                    default_route_links_to,
                } => self.project.resolve_conditional(&routes, default_route_links_to),
                NodeKind::Probability { routes } => {
                    self.project.select_weighted_route(&routes).ok()
                }
                NodeKind::Teleport {
                    destination_experience,
                    destination_start_node,
                } => self.teleport(&destination_experience, &destination_start_node),
                other => {
                    error!(node_type = other.type_name(), "unexpected node type in chain");
                    None
                }
            };
        };

        match landed {
            Some(node) => {
                self.current = Some(node.id);
                debug!(node = %node.id, node_type = node.type_name(), "advanced");
                Ok(self.resolve(&node))
            }
            None => {
                self.current = None;
                error!(from = %current_id, "the chain terminated with no valid node");
                Err(TraversalError::BrokenChain(current_id))
            }
        }
    }

    fn teleport(&mut self, experience: &str, start: &str) -> Option<NodeId> {
        let position = self.project.experience_position(experience).ok()?;
        self.experience = position;
        debug!(experience, start, "teleport");
        self.find_start_node(start).ok()
    }

    fn find_start_node(&self, name: &str) -> Result<NodeId, TraversalError> {
        match self.graph().start_node(name) {
            Some(node) => Ok(node.id),
            None => {
                warn!(experience = self.experience_name(), start = name, "start node not found");
                Err(TraversalError::UnknownStartNode {
                    experience: self.experience_name().to_string(),
                    name: name.to_string(),
                })
            }
        }
    }

    /// Copy a node with its template fields substituted.
    fn resolve(&self, node: &Node) -> Node {
        let mut resolved = node.clone();
        for property in &mut resolved.properties {
            property.value = self.project.substitute(&property.value);
        }
        match &mut resolved.kind {
            NodeKind::Dialog {
                dialog_source,
                dialog_string,
                ..
            } => {
                *dialog_source = self.project.substitute(dialog_source);
                *dialog_string = self.project.substitute(dialog_string);
            }
            NodeKind::Choice { choices } => {
                for choice in choices.iter_mut() {
                    choice.choice_string = self.project.substitute(&choice.choice_string);
                }
            }
            NodeKind::Function { statement, .. } => {
                *statement = self.project.substitute(statement);
            }
            _ => {}
        }
        resolved
    }
}
