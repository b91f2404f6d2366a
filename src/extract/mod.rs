pub mod fallback;
pub mod fields;
pub mod resolver;
