pub mod config;
pub mod document;
pub mod entity;
pub mod errors;
pub mod graph;
pub mod model;
pub mod query;
pub mod services;
