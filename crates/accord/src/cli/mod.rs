//! CLI command implementations

pub mod config;
pub mod context;
pub mod document;
pub mod output;
pub mod render;
pub mod resolve;
pub mod submit;
pub mod transition;
