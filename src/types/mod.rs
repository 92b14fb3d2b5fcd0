// Shared type definitions for the history view.

pub mod errors;
pub mod history;
pub mod settings;
