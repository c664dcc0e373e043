// src/core/mod.rs

pub mod dispatcher;
pub mod inventory;
pub mod machines;
pub mod project;
pub mod reporter;
