//! Gridline server
//!
//! Serves typed, filterable and paginated tables over HTTP.

pub mod api;
pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
