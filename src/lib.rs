//! Task API Library
//!
//! This library provides the task resource service: domain models,
//! request validation, HTTP handlers, and the task and session stores
//! they run against.

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
