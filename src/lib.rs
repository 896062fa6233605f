//! Client-side data access for the applytrack job-application tracker.
//!
//! `AppContext` wires everything together: a session persisted in a local
//! SQLite store, an HTTP transport that attaches the bearer token and ends
//! the session on 401, per-domain API modules that degrade to local data
//! when the backend is unavailable, and the reconciler that keeps one live
//! application per job.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod downloads;
pub mod error;
pub mod fallback;
pub mod logging;
pub mod models;
pub mod navigation;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod theme;
pub mod transport;

pub use context::AppContext;
pub use error::{ApiError, ApiResult, ErrorKind};
