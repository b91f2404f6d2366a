pub mod card_model;
pub mod classifier;
pub mod patterns;
pub mod signature;
