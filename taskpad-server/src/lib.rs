//! `Taskpad` REST collaborator library.
//!
//! Exposes the task API server for use in tests and embedding. Records
//! live in process memory and are scoped per user id.

pub mod config;
pub mod routes;
pub mod store;
