//! `Taskpad`: personal task tracker library.

pub mod cache;
pub mod config;
pub mod notify;
pub mod reminder;
pub mod remote;
pub mod session;
pub mod tasks;
