pub mod content;
pub mod factory;
