//! Action binding
//!
//! Server-declared operations (`Actions."#Type.Name"` and
//! `Actions.Oem.<Vendor>."#Vendor.Name"`) become named descriptors on a
//! resource. Invoking one validates the arguments against the ActionInfo
//! schema, when there is one, and POSTs them to the action target.

use super::materialize::{ACTION_MARKER, OEM_KEY};
use super::transport::Transport;
use super::validate::ActionValidator;
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// ActionInfo reference inside an action declaration
pub const ACTION_INFO_KEY: &str = "@Redfish.ActionInfo";
pub const TARGET_KEY: &str = "target";

/// A bound action
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    name: String,
    declared_as: String,
    vendor: Option<String>,
    target: Option<String>,
    info_address: Option<String>,
    schema: Option<Value>,
    validator: Option<ActionValidator>,
}

impl ActionDescriptor {
    /// Clean callable name, e.g. `Reset`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaration key, e.g. `#ComputerSystem.Reset`
    pub fn declared_as(&self) -> &str {
        &self.declared_as
    }

    /// Vendor block the action came from, `None` for standard actions
    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn info_address(&self) -> Option<&str> {
        self.info_address.as_deref()
    }

    /// ActionInfo document, if it was fetched
    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    pub fn validator(&self) -> Option<&ActionValidator> {
        self.validator.as_ref()
    }

    pub fn signature(&self) -> String {
        match &self.validator {
            Some(validator) => validator.signature(),
            None => "unvalidated".to_string(),
        }
    }

    /// Run the compiled validator; a no-op for unvalidated actions
    pub fn validate(&self, args: &Map<String, Value>) -> Result<()> {
        match &self.validator {
            Some(validator) => validator.validate(args).map_err(|source| Error::Validation {
                action: self.name.clone(),
                source,
            }),
            None => Ok(()),
        }
    }

    /// Validate, then POST `args` (or `{}`) to the target
    pub async fn invoke(
        &self,
        transport: &dyn Transport,
        args: Map<String, Value>,
    ) -> Result<Option<Value>> {
        let target = self
            .target
            .as_deref()
            .ok_or_else(|| Error::MissingTarget(self.name.clone()))?;
        self.validate(&args)?;

        tracing::info!("invoke action: name={}, target={}", self.name, target);
        transport.post(target, Some(&Value::Object(args))).await
    }
}

/// `#ComputerSystem.Reset` -> `Reset`, `#Contoso.v1.FruControl` -> `FruControl`
pub fn clean_name(declared: &str) -> &str {
    let stripped = declared.trim_start_matches(ACTION_MARKER);
    stripped.rsplit('.').next().unwrap_or(stripped)
}

/// Bind every action of an `Actions` block.
///
/// Standard actions bind first and a name binds once, so a vendor action
/// never replaces a standard one of the same clean name. Binding does not
/// look at the resource's attributes; actions live in their own namespace.
pub(crate) async fn bind_actions(
    transport: &dyn Transport,
    actions: &Map<String, Value>,
) -> BTreeMap<String, ActionDescriptor> {
    let mut bound = BTreeMap::new();

    for (key, info) in actions {
        if key.starts_with(ACTION_MARKER) {
            bind_one(transport, &mut bound, key, None, info).await;
        }
    }

    if let Some(Value::Object(vendors)) = actions.get(OEM_KEY) {
        for (vendor, vendor_actions) in vendors {
            let Value::Object(vendor_actions) = vendor_actions else {
                continue;
            };
            for (key, info) in vendor_actions {
                if key.starts_with(ACTION_MARKER) {
                    bind_one(transport, &mut bound, key, Some(vendor), info).await;
                }
            }
        }
    }

    bound
}

async fn bind_one(
    transport: &dyn Transport,
    bound: &mut BTreeMap<String, ActionDescriptor>,
    declared: &str,
    vendor: Option<&str>,
    info: &Value,
) {
    let name = clean_name(declared);
    if name.is_empty() {
        return;
    }
    if let Some(existing) = bound.get(name) {
        tracing::debug!(
            "action {} already bound from {}, skipping {}",
            name,
            existing.declared_as,
            declared
        );
        return;
    }

    let target = info.get(TARGET_KEY).and_then(Value::as_str).map(str::to_string);
    let info_address = info
        .get(ACTION_INFO_KEY)
        .and_then(Value::as_str)
        .map(str::to_string);

    let (schema, validator) = match info_address.as_deref() {
        Some(address) => match transport.get(address).await {
            Ok(schema) if schema.is_object() => {
                let validator = ActionValidator::from_schema(&schema);
                (Some(schema), Some(validator))
            },
            Ok(_) => {
                tracing::warn!("ActionInfo {} for {} is not an object", address, name);
                (None, None)
            },
            Err(e) => {
                tracing::warn!("ActionInfo {} for {} unavailable: {}", address, name, e);
                (None, None)
            },
        },
        None => (None, None),
    };

    bound.insert(
        name.to_string(),
        ActionDescriptor {
            name: name.to_string(),
            declared_as: declared.to_string(),
            vendor: vendor.map(str::to_string),
            target,
            info_address,
            schema,
            validator,
        },
    );
}
