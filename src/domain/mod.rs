pub mod mirror;
pub mod models;
pub mod registry;
pub mod settings;
