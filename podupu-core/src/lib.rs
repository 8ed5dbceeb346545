//! Core library for Podupu, a shared collection of Telugu riddles (podupu kathalu).
//!
//! Riddles live in a hosted table reached through a [`Backend`]. The
//! production backend is [`Client`], configured from the environment with
//! [`BackendConfig::from_env`]; [`SqliteBackend`] provides the same row
//! semantics over a local SQLite file. The query functions
//! ([`insert_riddle`], [`list_riddles`], [`update_riddle`], [`delete_riddle`])
//! work against either, and [`ExportFormat`] turns a list result into a
//! CSV or JSON download.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    auth::{Auth, Session, SignUp, User},
    backend::Backend,
    client::Client,
    config::BackendConfig,
    error::{PodupuError, Result},
    export::{parse_csv, to_csv_bytes, to_json_bytes, write_export, ExportFormat},
    operation::{Filter, Operation, Order, Query, Response},
    riddle::{Category, Difficulty, NewRiddle, Riddle, RiddleId, RiddlePatch},
    riddles::{
        delete_riddle, insert_riddle, list_riddles, update_riddle, RiddleFilter, UpdateOutcome,
        DEFAULT_LIMIT, TABLE_NAME,
    },
    storage::SqliteBackend,
};
