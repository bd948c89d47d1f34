pub mod document;
pub mod expression;
pub mod node;
