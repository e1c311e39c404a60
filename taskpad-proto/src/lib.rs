//! Shared model and wire definitions for `Taskpad`.

pub mod task;
pub mod wire;
