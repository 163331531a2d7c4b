//! Dynamic client object model for Redfish services.
//!
//! Remote JSON resources become a lazily-materialized graph of
//! [`Resource`] nodes: attributes, nested objects, links, collections and
//! invocable actions are discovered from the documents themselves.

pub mod config;
pub mod error;
pub mod redfish;
pub mod resource;

pub use error::{Error, Result, ValidationError};
pub use redfish::{ClientOptions, RedfishClient};
pub use resource::{Attribute, Created, MemoryTransport, Resource, Transport};
