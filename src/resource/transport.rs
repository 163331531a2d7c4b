//! Transport capability
//!
//! The graph engine never speaks HTTP itself. Everything remote goes through
//! this trait, which [`crate::redfish::RedfishClient`] implements for real
//! services and tests implement with in-memory spies.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the JSON document at `address`
    async fn get(&self, address: &str) -> Result<Value>;

    /// POST `body` (or `{}`) and return the response document, if any
    async fn post(&self, address: &str, body: Option<&Value>) -> Result<Option<Value>>;

    /// PATCH `fields`, conditional on `version` when one is known
    async fn patch(&self, address: &str, fields: &Value, version: Option<&str>) -> Result<()>;

    async fn delete(&self, address: &str) -> Result<()>;
}
