//! Resource graph engine
//!
//! Turns raw Redfish JSON into a navigable, lazily-materialized object graph.
//!
//! # Architecture
//!
//! - [`transport`] - The capability every remote call goes through
//! - [`node`] - [`Resource`]: lazy resolution, lookup, collections, CRUD
//! - [`materialize`] - Conversion, OEM and Links surfacing rules
//! - [`action`] - Binding and invoking server-declared actions
//! - [`validate`] - ActionInfo parameter validation
//! - [`attribute`] - Values exposed by a resource
//! - [`memory`] - In-memory recording transport for tests and offline use
//!
//! # Example
//!
//! ```ignore
//! use rfnav::resource::Resource;
//!
//! async fn power_on(system: &mut Resource) -> rfnav::Result<()> {
//!     if system.attr("PowerState").await? != "On" {
//!         let mut args = serde_json::Map::new();
//!         args.insert("ResetType".into(), "On".into());
//!         system.invoke("Reset", args).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod attribute;
pub mod materialize;
pub mod memory;
pub mod node;
pub mod transport;
pub mod validate;

pub use action::ActionDescriptor;
pub use attribute::Attribute;
pub use memory::{Call, MemoryTransport};
pub use node::{Created, Members, Resource};
pub use transport::Transport;
pub use validate::{ActionValidator, DataType, ParameterSpec};
