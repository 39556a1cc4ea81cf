//! Staff records bulk import
//!
//! Accepts CSV uploads of persons (students, employees, retirees), stages them
//! on disk and imports them asynchronously in batches, one all-or-nothing
//! transaction per file. Job progress is tracked in PostgreSQL and exposed
//! over HTTP.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
