pub mod plan;
pub mod show_config;
