//! Bridge between the UI thread and the worker runtime.

pub mod commands;
pub mod runtime;
