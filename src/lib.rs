//! Narrative Flow Runtime: an interpreter for branching dialogue graphs.
//!
//! Loads a compiled project exported by a visual narrative authoring tool,
//! keeps its variable table, and walks each experience's node graph,
//! resolving variable, conditional, probability and teleport nodes until
//! the next node the host should display.

pub mod core;
pub mod schema;

pub use crate::core::experience::{Experience, TraversalError};
pub use crate::core::project::{Project, ProjectBuilder, ProjectError};
pub use crate::schema::node::{Node, NodeId, NodeKind};
