use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A variable mutation carried by a `variable` node.
///
/// The operator is kept as authored and parsed when the assignment runs,
/// so an unrecognised operator is reported at that point instead of
/// rejecting the whole project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub variable: String,
    pub operator: String,
    pub value: String,
}

/// A single test of a variable against a literal, used by conditional routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub variable: String,
    pub operator: String,
    pub value: String,
}

/// Arithmetic and textual assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentOperator {
    /// `=`
    Set,
    /// `+` (addition, or concatenation for text)
    Add,
    /// `-`
    Subtract,
    /// `×`
    Multiply,
    /// `÷`
    Divide,
}

impl AssignmentOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Set => "=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
            Self::Divide => "÷",
        }
    }

    /// Returns true if the operator also has a meaning for non-numeric values.
    pub fn applies_to_text(&self) -> bool {
        matches!(self, Self::Set | Self::Add)
    }
}

impl FromStr for AssignmentOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Self::Set),
            "+" => Ok(Self::Add),
            "-" => Ok(Self::Subtract),
            "×" => Ok(Self::Multiply),
            "÷" => Ok(Self::Divide),
            other => Err(UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for AssignmentOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Comparison operators understood by conditional routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// `=`, exact text equality
    Equal,
    /// `≠`
    NotEqual,
    /// `<`
    Less,
    /// `≤`
    LessOrEqual,
    /// `>`
    Greater,
    /// `≥`
    GreaterOrEqual,
    /// `⊇`: the variable value contains the literal
    Contains,
    /// `⊉`
    NotContains,
    /// `∈`: the variable value occurs inside the literal
    In,
    /// `∉`
    NotIn,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "≠",
            Self::Less => "<",
            Self::LessOrEqual => "≤",
            Self::Greater => ">",
            Self::GreaterOrEqual => "≥",
            Self::Contains => "⊇",
            Self::NotContains => "⊉",
            Self::In => "∈",
            Self::NotIn => "∉",
        }
    }

    /// Returns true if both operands must parse as numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Less | Self::LessOrEqual | Self::Greater | Self::GreaterOrEqual
        )
    }
}

impl FromStr for ComparisonOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Self::Equal),
            "≠" => Ok(Self::NotEqual),
            "<" => Ok(Self::Less),
            "≤" => Ok(Self::LessOrEqual),
            ">" => Ok(Self::Greater),
            "≥" => Ok(Self::GreaterOrEqual),
            "⊇" => Ok(Self::Contains),
            "⊉" => Ok(Self::NotContains),
            "∈" => Ok(Self::In),
            "∉" => Ok(Self::NotIn),
            other => Err(UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An operator symbol outside the recognised set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operator '{}'", self.0)
    }
}

/// How a conditional route combines its comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    /// Every comparison holds.
    All,
    /// At least one comparison holds.
    Any,
    /// No comparison holds.
    None,
}

impl RouteMode {
    /// Decide whether a route matches given the AND and OR of its comparisons.
    pub fn matches(&self, all_true: bool, any_true: bool) -> bool {
        match self {
            Self::All => all_true,
            Self::Any => any_true,
            Self::None => !any_true,
        }
    }
}
