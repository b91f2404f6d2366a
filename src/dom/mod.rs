pub mod anchor;
pub mod tree;
