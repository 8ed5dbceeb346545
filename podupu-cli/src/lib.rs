//! Command-line front end for Podupu.
//!
//! Provides commands to add, browse, edit, delete and export riddles, and
//! to sign in and out of the hosted backend.

pub mod args;
pub mod commands;
pub mod errors;
pub mod session;

pub use args::{Cli, Command};
pub use commands::run;
pub use errors::{CliError, CliResult};
pub use session::SessionStore;
