//! # tagsql
//!
//! A small dynamic SQL builder with tag-driven record mapping.
//!
//! ## Features
//!
//! - **Chainable builder**: assemble SELECT/UPDATE/DELETE statements clause by clause
//! - **Cached rendering**: the statement text is built once and reused until a clause changes
//! - **Positional binding**: `?` placeholders are rewritten to the backend's token in order
//! - **Record mapping**: `#[derive(Record)]` declares a binding key per field, with omit-on-write
//! - **Explicit registry**: named connection handles live in an object you pass around
//!
//! ## Cargo features
//!
//! - `derive` (default): `#[derive(Record)]`
//! - `testing`: the scripted [`MockConnection`](testing::MockConnection) for downstream tests
//!
//! ## Example
//!
//! ```ignore
//! use tagsql::{ConnectionRegistry, Query, Record};
//!
//! #[derive(Debug, Default, Record)]
//! struct AdsTag {
//!     #[builder("id")]
//!     id: i64,
//!     #[builder("ad_id")]
//!     ad_id: i64,
//!     #[builder("content_tag")]
//!     content_tag: String,
//! }
//!
//! let registry = ConnectionRegistry::new();
//! registry.connect("bg_dsp4", &database_url).await?;
//!
//! let mut q = Query::new("ads_tags", "id", &registry, "bg_dsp4")?;
//! q.where_cmp("ad_id", "=", 7).order("id");
//! let tags: Vec<AdsTag> = q.fetch_all().await?;
//! ```

pub mod builder;
pub mod client;
pub mod dialect;
pub mod error;
pub mod exec;
mod numeric;
pub mod record;
pub mod registry;
pub mod row;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod value;

pub use builder::{JoinKind, Query};
pub use client::{Connection, Cursor, ExecSummary};
pub use dialect::Dialect;
pub use error::{OrmError, OrmResult};
pub use record::{FieldBinding, FieldKind, Record, from_record, to_record, to_record_strict};
pub use registry::ConnectionRegistry;
pub use row::{scan_all, scan_row};
pub use value::{Cell, FromValue, ParamMap, RowMap, ToValue, Value};

#[cfg(feature = "derive")]
pub use tagsql_derive::Record;
