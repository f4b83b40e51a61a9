//! Dialect-aware JSON key-path operations.
//!
//! Write `meta->profile->country` once; get `JSON_EXTRACT` on MySQL, `->>`
//! chains on PostgreSQL, dot-notation on document stores, and a plain-column
//! fallback everywhere else.
pub mod ast;
pub mod compose;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod path;
pub mod query;

pub use compose::{EmptyInPolicy, JsonFilter, JsonQueryExt};
pub use connection::ConnectionInfo;
pub use dialect::{
    AdapterRegistry, ComparisonOp, DialectAdapter, DialectKind, Fragment, SortDirection,
};
pub use error::{JsonFilterError, JsonResult};
pub use path::{KeyPath, SelectSpec};
pub use query::{DocumentQuery, QueryTarget, SqlQuery};
