//! Batched, fault-isolated image export for Figma documents.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
