//! Internal domain modules for the Podupu core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod operation;
pub mod rest;
pub mod riddle;
pub mod riddles;
pub mod storage;

#[doc(inline)]
pub use auth::{Auth, Session, SignUp, User};
#[doc(inline)]
pub use backend::Backend;
#[doc(inline)]
pub use client::Client;
#[doc(inline)]
pub use config::BackendConfig;
#[doc(inline)]
pub use error::{PodupuError, Result};
#[doc(inline)]
pub use export::{parse_csv, to_csv_bytes, to_json_bytes, write_export, ExportFormat};
#[doc(inline)]
pub use operation::{Filter, Operation, Order, Query, Response};
#[doc(inline)]
pub use riddle::{Category, Difficulty, NewRiddle, Riddle, RiddleId, RiddlePatch};
#[doc(inline)]
pub use riddles::{
    delete_riddle, insert_riddle, list_riddles, update_riddle, RiddleFilter, UpdateOutcome,
    DEFAULT_LIMIT, TABLE_NAME,
};
#[doc(inline)]
pub use storage::SqliteBackend;
