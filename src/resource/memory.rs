//! In-memory transport
//!
//! Serves documents from a map and records every call, which makes it a
//! convenient stand-in for a BMC in tests. PATCH merges fields into the
//! stored document and DELETE removes it, the way a real service would.

use super::transport::Transport;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A recorded transport call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get(String),
    Post {
        address: String,
        body: Value,
    },
    Patch {
        address: String,
        fields: Value,
        version: Option<String>,
    },
    Delete(String),
}

impl Call {
    pub fn address(&self) -> &str {
        match self {
            Call::Get(address) | Call::Delete(address) => address,
            Call::Post { address, .. } | Call::Patch { address, .. } => address,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTransport {
    documents: Mutex<HashMap<String, Value>>,
    post_responses: Mutex<HashMap<String, Value>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, address: &str, document: Value) -> Self {
        self.insert(address, document);
        self
    }

    pub fn insert(&self, address: &str, document: Value) {
        lock(&self.documents).insert(address.to_string(), document);
    }

    pub fn document(&self, address: &str) -> Option<Value> {
        lock(&self.documents).get(address).cloned()
    }

    /// Body returned by POSTs to `address` (default: no body)
    pub fn respond_to_post(&self, address: &str, response: Value) {
        lock(&self.post_responses).insert(address.to_string(), response);
    }

    /// Make every call against `address` fail with a 500 (PATCH: 412)
    pub fn fail(&self, address: &str) {
        lock(&self.failing).insert(address.to_string());
    }

    pub fn recover(&self, address: &str) {
        lock(&self.failing).remove(address);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: Call) {
        tracing::trace!("memory transport: {:?}", call);
        lock(&self.calls).push(call);
    }

    fn check(&self, method: &'static str, address: &str, status: u16) -> Result<()> {
        if lock(&self.failing).contains(address) {
            return Err(Error::Status {
                method,
                url: address.to_string(),
                status,
                body: String::new(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get(&self, address: &str) -> Result<Value> {
        self.record(Call::Get(address.to_string()));
        self.check("GET", address, 500)?;
        self.document(address).ok_or_else(|| Error::Status {
            method: "GET",
            url: address.to_string(),
            status: 404,
            body: String::new(),
        })
    }

    async fn post(&self, address: &str, body: Option<&Value>) -> Result<Option<Value>> {
        let body = body.cloned().unwrap_or_else(|| Value::Object(Map::new()));
        self.record(Call::Post {
            address: address.to_string(),
            body,
        });
        self.check("POST", address, 500)?;
        Ok(lock(&self.post_responses).get(address).cloned())
    }

    async fn patch(&self, address: &str, fields: &Value, version: Option<&str>) -> Result<()> {
        self.record(Call::Patch {
            address: address.to_string(),
            fields: fields.clone(),
            version: version.map(str::to_string),
        });
        self.check("PATCH", address, 412)?;

        let mut documents = lock(&self.documents);
        if let (Some(Value::Object(doc)), Value::Object(fields)) =
            (documents.get_mut(address), fields)
        {
            for (key, value) in fields {
                doc.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, address: &str) -> Result<()> {
        self.record(Call::Delete(address.to_string()));
        self.check("DELETE", address, 500)?;
        lock(&self.documents).remove(address);
        Ok(())
    }
}
