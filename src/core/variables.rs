/// Variable table: lookup, substitution, assignment and comparison.
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::core::project::ProjectError;
use crate::schema::document::Variable;
use crate::schema::expression::{
    Assignment, AssignmentOperator, Comparison, ComparisonOperator, UnknownOperator,
};

/// The project's variables in document order, indexed by exact name.
///
/// Order matters: [`VariableTable::substitute`] replaces names one variable
/// at a time in this order.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    variables: Vec<Variable>,
    initial_values: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl VariableTable {
    pub fn new(variables: Vec<Variable>) -> Result<Self, ProjectError> {
        let mut index = FxHashMap::default();
        for (i, variable) in variables.iter().enumerate() {
            if index.insert(variable.name.clone(), i).is_some() {
                return Err(ProjectError::DuplicateVariable(variable.name.clone()));
            }
        }
        let initial_values = variables.iter().map(|v| v.value.clone()).collect();
        Ok(Self {
            variables,
            initial_values,
            index,
        })
    }

    pub fn as_slice(&self) -> &[Variable] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&str, ProjectError> {
        match self.index.get(name) {
            Some(&i) => Ok(&self.variables[i].value),
            None => {
                warn!(variable = name, "variable not found");
                Err(ProjectError::UnknownVariable(name.to_string()))
            }
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), ProjectError> {
        match self.index.get(name) {
            Some(&i) => {
                self.variables[i].value = value.into();
                Ok(())
            }
            None => {
                warn!(variable = name, "variable not found");
                Err(ProjectError::UnknownVariable(name.to_string()))
            }
        }
    }

    /// Restore every variable to the value it was loaded with.
    pub fn reset(&mut self) {
        for (variable, initial) in self.variables.iter_mut().zip(&self.initial_values) {
            variable.value.clone_from(initial);
        }
    }

    /// Replace variable names in `text` with their current values.
    ///
    /// Variables are applied in table order and each pass runs over the
    /// output of the previous one, so a value that contains the name of a
    /// later variable is itself substituted.
    pub fn substitute(&self, text: &str) -> String {
        let mut result = text.to_string();
        for variable in &self.variables {
            if variable.name.is_empty() || !result.contains(variable.name.as_str()) {
                continue;
            }
            result = result.replace(variable.name.as_str(), &variable.value);
        }
        result
    }

    /// Apply an assignment to its variable.
    ///
    /// When both the current value and the substituted literal parse as
    /// numbers the arithmetic operators apply; otherwise only `=` and `+`
    /// (concatenation) are allowed. `=` always stores the raw literal, and
    /// concatenation appends the raw literal, not its substituted form.
    pub fn process_assignment(&mut self, assignment: &Assignment) -> Result<(), ProjectError> {
        let current = self.get(&assignment.variable)?;
        let operator: AssignmentOperator = assignment
            .operator
            .parse()
            .map_err(|e: UnknownOperator| invalid_operator(&e.0, "not an assignment operator"))?;

        let literal = self.substitute(&assignment.value);
        let new_value = match (parse_number(current), parse_number(&literal)) {
            (Some(lhs), Some(rhs)) => match operator {
                AssignmentOperator::Set => assignment.value.clone(),
                AssignmentOperator::Add => format_number(lhs + rhs),
                AssignmentOperator::Subtract => format_number(lhs - rhs),
                AssignmentOperator::Multiply => format_number(lhs * rhs),
                AssignmentOperator::Divide => format_number(lhs / rhs),
            },
            _ => match operator {
                AssignmentOperator::Set => assignment.value.clone(),
                AssignmentOperator::Add => format!("{}{}", current, assignment.value),
                other => return Err(invalid_operator(other.symbol(), "cannot be applied to text")),
            },
        };

        trace!(
            variable = %assignment.variable,
            operator = %operator,
            value = %new_value,
            "assignment applied"
        );
        self.set(&assignment.variable, new_value)
    }

    /// Evaluate a comparison between a variable and a substituted literal.
    pub fn evaluate_comparison(&self, comparison: &Comparison) -> Result<bool, ProjectError> {
        let value = self.get(&comparison.variable)?;
        let operator: ComparisonOperator = comparison
            .operator
            .parse()
            .map_err(|e: UnknownOperator| invalid_operator(&e.0, "not a comparison operator"))?;
        let literal = self.substitute(&comparison.value);

        let result = match operator {
            ComparisonOperator::Equal => value == literal,
            ComparisonOperator::NotEqual => value != literal,
            ComparisonOperator::Contains => value.contains(literal.as_str()),
            ComparisonOperator::NotContains => !value.contains(literal.as_str()),
            ComparisonOperator::In => literal.contains(value),
            ComparisonOperator::NotIn => !literal.contains(value),
            numeric => {
                let (Some(lhs), Some(rhs)) = (parse_number(value), parse_number(&literal)) else {
                    return Err(invalid_operator(numeric.symbol(), "requires numeric operands"));
                };
                match numeric {
                    ComparisonOperator::Less => lhs < rhs,
                    ComparisonOperator::LessOrEqual => lhs <= rhs,
                    ComparisonOperator::Greater => lhs > rhs,
                    _ => lhs >= rhs,
                }
            }
        };
        Ok(result)
    }
}

/// Parse authored text as a double. Surrounding whitespace is ignored.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Canonical text for a computed number: the shortest form that parses
/// back to the same value (`15`, `2.5`, `inf`, `NaN`).
pub fn format_number(value: f64) -> String {
    value.to_string()
}

fn invalid_operator(operator: &str, reason: &'static str) -> ProjectError {
    warn!(operator, reason, "invalid operator");
    ProjectError::InvalidOperator {
        operator: operator.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> VariableTable {
        VariableTable::new(
            pairs
                .iter()
                .map(|(name, value)| Variable {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn assign(variable: &str, operator: &str, value: &str) -> Assignment {
        Assignment {
            variable: variable.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
        }
    }

    fn compare(variable: &str, operator: &str, value: &str) -> Comparison {
        Comparison {
            variable: variable.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn duplicate_names_rejected() {
        let result = VariableTable::new(vec![
            Variable {
                name: "x".to_string(),
                value: "1".to_string(),
            },
            Variable {
                name: "x".to_string(),
                value: "2".to_string(),
            },
        ]);
        assert!(matches!(result, Err(ProjectError::DuplicateVariable(name)) if name == "x"));
    }

    #[test]
    fn lookup_is_stable_without_writes() {
        let vars = table(&[("gold", "12")]);
        assert_eq!(vars.get("gold").unwrap(), "12");
        assert_eq!(vars.get("gold").unwrap(), "12");
    }

    #[test]
    fn lookup_is_exact() {
        let vars = table(&[("Gold", "12")]);
        assert!(matches!(vars.get("gold"), Err(ProjectError::UnknownVariable(_))));
    }

    #[test]
    fn set_unknown_variable_fails() {
        let mut vars = table(&[("a", "1")]);
        assert!(vars.set("b", "2").is_err());
        vars.set("a", "3").unwrap();
        assert_eq!(vars.get("a").unwrap(), "3");
    }

    #[test]
    fn reset_restores_loaded_values() {
        let mut vars = table(&[("a", "1"), ("b", "x")]);
        vars.set("a", "9").unwrap();
        vars.set("b", "y").unwrap();
        vars.reset();
        assert_eq!(vars.get("a").unwrap(), "1");
        assert_eq!(vars.get("b").unwrap(), "x");
    }

    #[test]
    fn substitution_chains_in_table_order() {
        let vars = table(&[("A", "B"), ("B", "C")]);
        assert_eq!(vars.substitute("A"), "C");
    }

    #[test]
    fn substitution_does_not_chain_backwards() {
        let vars = table(&[("B", "C"), ("A", "B")]);
        assert_eq!(vars.substitute("A"), "B");
    }

    #[test]
    fn substitution_replaces_every_occurrence() {
        let vars = table(&[("$hero", "Ava")]);
        assert_eq!(vars.substitute("$hero met $hero."), "Ava met Ava.");
        assert_eq!(vars.substitute("nobody here"), "nobody here");
    }

    #[test]
    fn empty_names_are_skipped() {
        let vars = table(&[("", "!")]);
        assert_eq!(vars.substitute("abc"), "abc");
    }

    #[test]
    fn numeric_addition_stores_canonical_text() {
        let mut vars = table(&[("x", "10")]);
        vars.process_assignment(&assign("x", "+", "5")).unwrap();
        assert_eq!(vars.get("x").unwrap(), "15");
        assert_eq!(parse_number(vars.get("x").unwrap()), Some(15.0));
    }

    #[test]
    fn numeric_operators() {
        let mut vars = table(&[("x", "10")]);
        vars.process_assignment(&assign("x", "-", "4")).unwrap();
        assert_eq!(vars.get("x").unwrap(), "6");
        vars.process_assignment(&assign("x", "×", "2.5")).unwrap();
        assert_eq!(vars.get("x").unwrap(), "15");
        vars.process_assignment(&assign("x", "÷", "4")).unwrap();
        assert_eq!(vars.get("x").unwrap(), "3.75");
    }

    #[test]
    fn set_keeps_raw_literal() {
        let mut vars = table(&[("x", "10")]);
        vars.process_assignment(&assign("x", "=", "5.0")).unwrap();
        assert_eq!(vars.get("x").unwrap(), "5.0");
        vars.process_assignment(&assign("x", "=", "5")).unwrap();
        assert_eq!(vars.get("x").unwrap(), "5");
    }

    #[test]
    fn set_does_not_substitute() {
        let mut vars = table(&[("x", "1"), ("y", "2")]);
        vars.process_assignment(&assign("x", "=", "y")).unwrap();
        assert_eq!(vars.get("x").unwrap(), "y");
    }

    #[test]
    fn numeric_mode_uses_substituted_literal() {
        let mut vars = table(&[("x", "10"), ("step", "3")]);
        vars.process_assignment(&assign("x", "+", "step")).unwrap();
        assert_eq!(vars.get("x").unwrap(), "13");
    }

    #[test]
    fn text_concatenation_uses_raw_literal() {
        let mut vars = table(&[("title", "Sir "), ("name", "Ava")]);
        vars.process_assignment(&assign("title", "+", "name")).unwrap();
        assert_eq!(vars.get("title").unwrap(), "Sir name");
    }

    #[test]
    fn arithmetic_on_text_is_rejected() {
        let mut vars = table(&[("mood", "happy")]);
        let result = vars.process_assignment(&assign("mood", "-", "1"));
        assert!(matches!(result, Err(ProjectError::InvalidOperator { .. })));
        assert_eq!(vars.get("mood").unwrap(), "happy");
    }

    #[test]
    fn unknown_assignment_operator_is_rejected() {
        let mut vars = table(&[("x", "1")]);
        let result = vars.process_assignment(&assign("x", "%", "2"));
        assert!(matches!(result, Err(ProjectError::InvalidOperator { ref operator, .. }) if operator == "%"));
        assert_eq!(vars.get("x").unwrap(), "1");
    }

    #[test]
    fn assignment_to_unknown_variable_is_noop() {
        let mut vars = table(&[("x", "1")]);
        assert!(vars.process_assignment(&assign("y", "=", "2")).is_err());
        assert_eq!(vars.get("x").unwrap(), "1");
    }

    #[test]
    fn division_by_zero_follows_float_semantics() {
        let mut vars = table(&[("x", "1"), ("z", "0")]);
        vars.process_assignment(&assign("x", "÷", "0")).unwrap();
        assert_eq!(vars.get("x").unwrap(), "inf");
        vars.process_assignment(&assign("z", "÷", "0")).unwrap();
        assert_eq!(vars.get("z").unwrap(), "NaN");
    }

    #[test]
    fn equality_is_textual() {
        let vars = table(&[("n", "5")]);
        assert!(vars.evaluate_comparison(&compare("n", "=", "5")).unwrap());
        assert!(!vars.evaluate_comparison(&compare("n", "=", "5.0")).unwrap());
        assert!(vars.evaluate_comparison(&compare("n", "≠", "5.0")).unwrap());
    }

    #[test]
    fn equality_substitutes_literal() {
        let vars = table(&[("a", "7"), ("b", "7")]);
        assert!(vars.evaluate_comparison(&compare("a", "=", "b")).unwrap());
    }

    #[test]
    fn ordering_is_numeric() {
        let vars = table(&[("n", "9")]);
        assert!(vars.evaluate_comparison(&compare("n", "<", "10")).unwrap());
        assert!(vars.evaluate_comparison(&compare("n", "≤", "9")).unwrap());
        assert!(!vars.evaluate_comparison(&compare("n", ">", "10")).unwrap());
        assert!(vars.evaluate_comparison(&compare("n", "≥", "9.0")).unwrap());
    }

    #[test]
    fn ordering_on_text_is_an_error() {
        let vars = table(&[("n", "nine")]);
        assert!(vars.evaluate_comparison(&compare("n", "<", "10")).is_err());
    }

    #[test]
    fn substring_operators_respect_direction() {
        let vars = table(&[("tag", "red,blue")]);
        assert!(vars.evaluate_comparison(&compare("tag", "⊇", "blue")).unwrap());
        assert!(!vars.evaluate_comparison(&compare("tag", "⊉", "blue")).unwrap());
        assert!(!vars.evaluate_comparison(&compare("tag", "∈", "blue")).unwrap());
        assert!(vars.evaluate_comparison(&compare("tag", "∉", "blue")).unwrap());
        assert!(vars
            .evaluate_comparison(&compare("tag", "∈", "green,red,blue"))
            .unwrap());
    }

    #[test]
    fn comparison_errors() {
        let vars = table(&[("n", "1")]);
        assert!(matches!(
            vars.evaluate_comparison(&compare("m", "=", "1")),
            Err(ProjectError::UnknownVariable(_))
        ));
        assert!(matches!(
            vars.evaluate_comparison(&compare("n", "==", "1")),
            Err(ProjectError::InvalidOperator { .. })
        ));
    }
}
