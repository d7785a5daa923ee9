//! geo-golden command line library
//!
//! Argument parsing, the subprocess-backed processing tool and the command
//! handlers. The binary entry point is in main.rs.

pub mod authoring;
pub mod cli;
pub mod commands;
pub mod tool;

// Re-export commonly used types
pub use authoring::{draft_definition, write_definition, DefinitionDraft};
pub use cli::{Cli, Command};
pub use tool::ProcessTool;
