pub mod aggregator;
pub mod stability_model;
