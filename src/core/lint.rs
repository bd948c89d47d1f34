/// Static checks over a loaded project: dangling links, unreachable
/// teleport targets, unknown variables and operators, unusable weights.
use rustc_hash::FxHashSet;
use std::fmt;

use crate::core::project::{ExperienceGraph, Project};
use crate::core::variables::parse_number;
use crate::schema::expression::{AssignmentOperator, ComparisonOperator};
use crate::schema::node::{Node, NodeKind};

/// Findings of [`lint`], grouped by severity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LintReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

impl fmt::Display for LintReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for warning in &self.warnings {
            writeln!(f, "WARNING: {}", warning)?;
        }
        for error in &self.errors {
            writeln!(f, "ERROR: {}", error)?;
        }
        write!(
            f,
            "Summary: {} errors, {} warnings",
            self.errors.len(),
            self.warnings.len()
        )
    }
}

pub fn lint(project: &Project) -> LintReport {
    let mut report = LintReport::default();
    for graph in project.experiences() {
        if graph.start_node_names().next().is_none() {
            report
                .warnings
                .push(format!("Experience '{}' has no start node", graph.name()));
        }
        for node in graph.nodes() {
            lint_node(project, graph, node, &mut report);
        }
    }
    report
}

fn lint_node(project: &Project, graph: &ExperienceGraph, node: &Node, report: &mut LintReport) {
    let at = format!("Node {} ({}) in '{}'", node.id, node.type_name(), graph.name());

    for target in node.outgoing_links() {
        if graph.node(target).is_none() {
            report
                .errors
                .push(format!("{} links to missing node {}", at, target));
        }
    }

    let variables = project.variable_table();
    match &node.kind {
        NodeKind::Start { links_to: None, .. }
        | NodeKind::Dialog { links_to: None, .. }
        | NodeKind::Function { links_to: None, .. }
        | NodeKind::Variable { links_to: None, .. } => {
            report.warnings.push(format!("{} has no outgoing link", at));
        }
        _ => {}
    }

    match &node.kind {
        NodeKind::Choice { choices } => {
            if choices.is_empty() {
                report.warnings.push(format!("{} has no choices", at));
            }
            for (i, choice) in choices.iter().enumerate() {
                if choice.links_to.is_none() {
                    report
                        .warnings
                        .push(format!("{} choice {} has no outgoing link", at, i));
                }
            }
        }
        NodeKind::Variable { assignments, .. } => {
            for assignment in assignments {
                if !variables.contains(&assignment.variable) {
                    report.errors.push(format!(
                        "{} assigns unknown variable '{}'",
                        at, assignment.variable
                    ));
                }
                if assignment.operator.parse::<AssignmentOperator>().is_err() {
                    report.errors.push(format!(
                        "{} uses invalid assignment operator '{}'",
                        at, assignment.operator
                    ));
                }
            }
        }
        NodeKind::Conditional {
            routes,
            default_route_links_to,
        } => {
            if default_route_links_to.is_none() {
                report
                    .warnings
                    .push(format!("{} has no default route", at));
            }
            for comparison in routes.iter().flat_map(|r| &r.comparisons) {
                if !variables.contains(&comparison.variable) {
                    report.errors.push(format!(
                        "{} compares unknown variable '{}'",
                        at, comparison.variable
                    ));
                }
                if comparison.operator.parse::<ComparisonOperator>().is_err() {
                    report.errors.push(format!(
                        "{} uses invalid comparison operator '{}'",
                        at, comparison.operator
                    ));
                }
            }
        }
        NodeKind::Probability { routes } => {
            if routes.is_empty() {
                report.errors.push(format!("{} has no routes", at));
            }
            for (i, route) in routes.iter().enumerate() {
                let usable = parse_number(&variables.substitute(&route.weight))
                    .is_some_and(|w| w.is_finite() && w >= 0.0);
                if !usable {
                    report.warnings.push(format!(
                        "{} route {} weight '{}' does not parse with loaded values",
                        at, i, route.weight
                    ));
                }
            }
        }
        NodeKind::Teleport {
            destination_experience,
            destination_start_node,
        } => match project
            .experiences()
            .iter()
            .find(|e| e.name() == destination_experience.as_str())
        {
            None => report.errors.push(format!(
                "{} teleports to missing experience '{}'",
                at, destination_experience
            )),
            Some(target) => {
                let starts: FxHashSet<&str> = target.start_node_names().collect();
                if !starts.contains(destination_start_node.as_str()) {
                    report.errors.push(format!(
                        "{} teleports to missing start node '{}' in '{}'",
                        at, destination_start_node, destination_experience
                    ));
                }
            }
        },
        _ => {}
    }
}
