pub mod fetch_config;
pub mod fetcher;
pub mod fixture;
pub mod http;
pub mod session;
