/// Route resolution for conditional and probability nodes.
use rand::Rng;
use tracing::{debug, warn};

use crate::core::project::ProjectError;
use crate::core::variables::{parse_number, VariableTable};
use crate::schema::node::{ConditionalRoute, NodeId, WeightedRoute};

/// Pick the target of a conditional node.
///
/// Every route is evaluated and the last matching one wins. A comparison
/// that cannot be evaluated counts as false. Falls back to `default` when
/// no route matches.
pub fn resolve_conditional(
    variables: &VariableTable,
    routes: &[ConditionalRoute],
    default: Option<NodeId>,
) -> Option<NodeId> {
    let mut chosen = None;
    for (i, route) in routes.iter().enumerate() {
        let results: Vec<bool> = route
            .comparisons
            .iter()
            .map(|c| variables.evaluate_comparison(c).unwrap_or(false))
            .collect();
        let all_true = results.iter().all(|&r| r);
        let any_true = results.iter().any(|&r| r);

        if route.mode.matches(all_true, any_true) {
            debug!(route = i, links_to = %route.links_to, "conditional route matched");
            chosen = Some(route.links_to);
        }
    }
    if chosen.is_none() {
        debug!("no conditional route matched, taking default");
    }
    chosen.or(default)
}

/// Draw one route from `routes`, with probability proportional to weight.
///
/// Weights are substituted and parsed as non-negative numbers; routes whose
/// weight does not parse are left out. Falls back to the last usable route
/// if rounding leaves the sample past the final cumulative weight.
pub fn select_weighted_route<R: Rng + ?Sized>(
    variables: &VariableTable,
    routes: &[WeightedRoute],
    rng: &mut R,
) -> Result<NodeId, ProjectError> {
    let mut valid: Vec<(f64, NodeId)> = Vec::with_capacity(routes.len());
    for (i, route) in routes.iter().enumerate() {
        match parse_number(&variables.substitute(&route.weight)) {
            Some(weight) if weight.is_finite() && weight >= 0.0 => {
                valid.push((weight, route.links_to));
            }
            _ => warn!(route = i, weight = %route.weight, "could not parse route weight"),
        }
    }

    let Some(&(_, last)) = valid.last() else {
        warn!("no valid probability routes");
        return Err(ProjectError::NoValidRoute);
    };

    let total: f64 = valid.iter().map(|(w, _)| w).sum();
    let sample = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for &(weight, links_to) in &valid {
        cumulative += weight;
        if sample < cumulative {
            debug!(sample, total, links_to = %links_to, "probability route chosen");
            return Ok(links_to);
        }
    }
    Ok(last)
}
