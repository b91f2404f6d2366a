pub mod combinator;
pub mod discovery;
pub mod variant_model;
