pub mod experience;
pub mod lint;
pub mod project;
pub mod routing;
pub mod variables;
