//! Resource nodes
//!
//! A [`Resource`] wraps one Redfish JSON object. It starts either with data
//! (an embedded object or an already-fetched document) or as a link stub with
//! only an address, and materializes on first use: attribute access,
//! iteration, length checks, or an explicit refresh.
//!
//! Lookup falls back through mapped attribute -> raw field -> singular form
//! of a one-element plural -> `NotFound`.
//!
//! Nodes share no mutable state. Clones, and nodes reached twice through
//! different paths, are independent and each fetches for itself. Methods that
//! can materialize take `&mut self`; share a node across tasks only behind
//! your own lock.

use super::action::{self, ActionDescriptor};
use super::attribute::Attribute;
use super::materialize::{
    self, ACTIONS_KEY, ALLOWABLE_VALUES_SUFFIX, ETAG_KEY, LINK_KEY, MEMBERS_KEY, TYPE_KEY,
};
use super::transport::Transport;
use crate::error::{Error, Result};
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Resource {
    transport: Arc<dyn Transport>,
    address: Option<String>,
    /// Last known good document; `None` only for unfetched link stubs
    raw: Option<Map<String, Value>>,
    materialized: bool,
    is_collection: bool,
    attributes: BTreeMap<String, Attribute>,
    actions: BTreeMap<String, ActionDescriptor>,
}

/// Outcome of [`Resource::create`]
#[derive(Debug)]
pub enum Created {
    /// The service returned the new member
    Member(Resource),
    /// No usable body came back; the collection was refreshed instead so the
    /// caller can look for the new member
    Refreshed,
}

impl Resource {
    /// A link stub: no data, no network cost until first use
    pub fn stub(transport: Arc<dyn Transport>, address: impl Into<String>) -> Self {
        Self {
            transport,
            address: Some(address.into()),
            raw: None,
            materialized: false,
            is_collection: false,
            attributes: BTreeMap::new(),
            actions: BTreeMap::new(),
        }
    }

    /// A resource carrying data that is mapped on first use
    pub fn embedded(
        transport: Arc<dyn Transport>,
        address: Option<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            transport,
            address,
            raw: Some(data),
            materialized: false,
            is_collection: false,
            attributes: BTreeMap::new(),
            actions: BTreeMap::new(),
        }
    }

    /// A resource materialized right away from a known document
    pub async fn from_document(
        transport: Arc<dyn Transport>,
        address: Option<String>,
        data: Map<String, Value>,
    ) -> Self {
        let mut resource = Self::embedded(transport, address, Map::new());
        resource.materialize(data).await;
        resource
    }

    // =========================================================================
    // Materialization
    // =========================================================================

    /// Fetch (link stubs) and map (everything) if that has not happened yet
    pub async fn ensure_materialized(&mut self) -> Result<()> {
        if self.materialized {
            return Ok(());
        }

        let doc = match self.raw.take() {
            Some(doc) => doc,
            None => {
                let address = self
                    .address
                    .clone()
                    .ok_or(Error::MissingAddress("fetch"))?;
                fetch_document(self.transport.as_ref(), &address).await?
            },
        };

        self.materialize(doc).await;
        Ok(())
    }

    /// Map `doc` onto this resource, replacing any earlier attributes
    async fn materialize(&mut self, doc: Map<String, Value>) {
        if self.address.is_none() {
            self.address = doc.get(LINK_KEY).and_then(Value::as_str).map(str::to_string);
        }

        let mut attributes = BTreeMap::new();
        let standard = materialize::map_standard(&self.transport, &doc, &mut attributes);
        let oem = materialize::surface_oem(&self.transport, &doc, &mut attributes);
        let links = materialize::surface_links(&self.transport, &doc, &mut attributes);

        let actions = match doc.get(ACTIONS_KEY) {
            Some(Value::Object(declared)) => {
                action::bind_actions(self.transport.as_ref(), declared).await
            },
            _ => BTreeMap::new(),
        };

        tracing::trace!(
            "materialized {}: {} fields, {} oem, {} links, {} actions",
            self.address.as_deref().unwrap_or("<embedded>"),
            standard,
            oem,
            links,
            actions.len()
        );

        self.is_collection = matches!(doc.get(MEMBERS_KEY), Some(Value::Array(_)));
        self.attributes = attributes;
        self.actions = actions;
        self.raw = Some(doc);
        self.materialized = true;
    }

    // =========================================================================
    // Attribute access
    // =========================================================================

    /// Look up an attribute by name.
    ///
    /// Falls back to raw fields with non-identifier names (such as
    /// `Members@odata.count`) and then to singular access: `System` yields
    /// the only member of `Systems` when there is exactly one.
    pub async fn attr(&mut self, name: &str) -> Result<Attribute> {
        self.ensure_materialized().await?;

        if let Some(attribute) = self.attributes.get(name) {
            return Ok(attribute.clone());
        }
        if let Some(value) = self.raw_field(name) {
            return Ok(Attribute::Value(value.clone()));
        }
        if let Some(single) = self.singular(name).await? {
            return Ok(single);
        }

        Err(self.not_found(name))
    }

    /// Mutable access to a mapped attribute, so navigation through it is
    /// cached on this node
    pub async fn attr_mut(&mut self, name: &str) -> Result<&mut Attribute> {
        self.ensure_materialized().await?;
        let Self {
            attributes,
            raw,
            address,
            ..
        } = self;
        match attributes.get_mut(name) {
            Some(attribute) => Ok(attribute),
            None => Err(Error::NotFound {
                resource: label(raw.as_ref(), address.as_deref()),
                name: name.to_string(),
            }),
        }
    }

    /// Nested resource under `name`, materialized in place
    pub async fn child(&mut self, name: &str) -> Result<&mut Resource> {
        let resource_name = self.to_string();
        match self.attr_mut(name).await? {
            Attribute::Resource(child) => {
                child.ensure_materialized().await?;
                Ok(&mut **child)
            },
            _ => Err(Error::NotFound {
                resource: resource_name,
                name: name.to_string(),
            }),
        }
    }

    async fn singular(&mut self, name: &str) -> Result<Option<Attribute>> {
        let plural = format!("{}s", name);
        let Some(candidate) = self.attributes.get_mut(&plural) else {
            return Ok(None);
        };

        match candidate {
            Attribute::List(items) if items.len() == 1 => Ok(Some(items[0].clone())),
            Attribute::Resource(collection) => {
                collection.ensure_materialized().await?;
                if !collection.is_collection || collection.member_entries().len() != 1 {
                    return Ok(None);
                }
                let Some(mut member) = collection.member_resources().next() else {
                    return Ok(None);
                };
                member.ensure_materialized().await?;
                Ok(Some(member.into()))
            },
            _ => Ok(None),
        }
    }

    /// Assign an attribute.
    ///
    /// A simple value over an existing simple field is PATCHed right away
    /// (with the version token, if known) and applied locally only once the
    /// service accepts it. Anything else is a local-only change; use
    /// [`Resource::update`] for compound writes.
    pub async fn set_attr(&mut self, name: &str, value: Value) -> Result<()> {
        self.ensure_materialized().await?;

        let remote = self
            .raw_field(name)
            .is_some_and(|current| !current.is_object() && !current.is_array());
        if !remote {
            tracing::debug!("local-only attribute {} on {}", name, self);
            self.attributes.insert(name.to_string(), Attribute::Value(value));
            return Ok(());
        }

        let address = self.address.clone().ok_or(Error::MissingAddress("PATCH"))?;
        let version = self.version_token().map(str::to_string);
        let mut fields = Map::new();
        fields.insert(name.to_string(), value.clone());

        tracing::info!("PATCH {} field {}", address, name);
        self.transport
            .patch(&address, &Value::Object(fields), version.as_deref())
            .await?;

        if let Some(raw) = self.raw.as_mut() {
            raw.insert(name.to_string(), value.clone());
        }
        self.attributes.insert(name.to_string(), Attribute::Value(value));
        Ok(())
    }

    /// Raw field lookup with a default of `None`
    pub async fn get(&mut self, key: &str) -> Result<Option<Value>> {
        self.ensure_materialized().await?;
        Ok(self.raw_field(key).cloned())
    }

    /// Raw field lookup that fails with `NotFound`
    pub async fn item(&mut self, key: &str) -> Result<Value> {
        self.get(key).await?.ok_or_else(|| self.not_found(key))
    }

    /// `<prop>@Redfish.AllowableValues`, if the service declares it
    pub async fn allowable_values(&mut self, prop: &str) -> Result<Option<Vec<Value>>> {
        let key = format!("{}{}", prop, ALLOWABLE_VALUES_SUFFIX);
        Ok(self
            .get(&key)
            .await?
            .and_then(|v| v.as_array().cloned()))
    }

    /// Deep copy of the raw document
    pub async fn to_document(&mut self) -> Result<Value> {
        self.ensure_materialized().await?;
        Ok(Value::Object(self.raw.clone().unwrap_or_default()))
    }

    pub async fn attribute_names(&mut self) -> Result<Vec<String>> {
        self.ensure_materialized().await?;
        Ok(self.attributes.keys().cloned().collect())
    }

    // =========================================================================
    // Identity and metadata
    // =========================================================================

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    /// True when the node carries data (fetched or embedded)
    pub fn has_data(&self) -> bool {
        self.raw.is_some()
    }

    /// `Id`, else `Name`, else the address
    pub async fn identity(&mut self) -> Result<String> {
        self.ensure_materialized().await?;
        Ok(self.identity_hint().unwrap_or_else(|| "<unknown>".to_string()))
    }

    pub async fn odata_type(&mut self) -> Result<String> {
        self.ensure_materialized().await?;
        Ok(self.type_hint().unwrap_or("Resource").to_string())
    }

    pub async fn is_collection(&mut self) -> Result<bool> {
        self.ensure_materialized().await?;
        Ok(self.is_collection)
    }

    /// Entity tag of the last known document
    pub fn version_token(&self) -> Option<&str> {
        self.raw_field(ETAG_KEY).and_then(Value::as_str)
    }

    fn raw_field(&self, key: &str) -> Option<&Value> {
        self.raw.as_ref().and_then(|raw| raw.get(key))
    }

    fn identity_hint(&self) -> Option<String> {
        identity_of(self.raw.as_ref(), self.address.as_deref()).map(str::to_string)
    }

    fn type_hint(&self) -> Option<&str> {
        type_of(self.raw.as_ref())
    }

    fn not_found(&self, name: &str) -> Error {
        Error::NotFound {
            resource: self.to_string(),
            name: name.to_string(),
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    pub async fn action_names(&mut self) -> Result<Vec<String>> {
        self.ensure_materialized().await?;
        Ok(self.actions.keys().cloned().collect())
    }

    pub async fn action(&mut self, name: &str) -> Result<&ActionDescriptor> {
        self.ensure_materialized().await?;
        self.actions
            .get(name)
            .ok_or_else(|| self.action_not_found(name))
    }

    /// Invoke a bound action with keyword arguments
    pub async fn invoke(&mut self, name: &str, args: Map<String, Value>) -> Result<Option<Value>> {
        self.ensure_materialized().await?;
        let Some(descriptor) = self.actions.get(name) else {
            return Err(self.action_not_found(name));
        };
        descriptor.invoke(self.transport.as_ref(), args).await
    }

    fn action_not_found(&self, name: &str) -> Error {
        Error::ActionNotFound {
            resource: self.to_string(),
            name: name.to_string(),
        }
    }

    // =========================================================================
    // Collections
    // =========================================================================

    fn member_entries(&self) -> &[Value] {
        self.raw_field(MEMBERS_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn member_resources(&self) -> Members<'_> {
        Members {
            transport: &self.transport,
            entries: self.member_entries().iter(),
        }
    }

    fn require_collection(&self, operation: &'static str) -> Result<()> {
        if self.is_collection {
            Ok(())
        } else {
            Err(Error::NotACollection {
                resource: self.to_string(),
                operation,
            })
        }
    }

    /// Lazy iterator of member stubs; call again to restart
    pub async fn members(&mut self) -> Result<Members<'_>> {
        self.ensure_materialized().await?;
        self.require_collection("iteration")?;
        Ok(self.member_resources())
    }

    /// Length of the `Members` sequence
    pub async fn len(&mut self) -> Result<usize> {
        self.ensure_materialized().await?;
        self.require_collection("len()")?;
        Ok(self.member_entries().len())
    }

    pub async fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Fetch every member concurrently. Members are independent nodes.
    pub async fn load_members(&mut self) -> Result<Vec<Resource>> {
        let members: Vec<Resource> = self.members().await?.collect();
        try_join_all(members.into_iter().map(|mut member| async move {
            member.ensure_materialized().await?;
            Ok::<_, Error>(member)
        }))
        .await
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// POST a new member into this collection
    pub async fn create(&mut self, new_data: &Value) -> Result<Created> {
        self.ensure_materialized().await?;
        self.require_collection("create()")?;
        let address = self.address.clone().ok_or(Error::MissingAddress("POST"))?;

        tracing::info!("create member in {}", address);
        let response = self.transport.post(&address, Some(new_data)).await?;

        if let Some(Value::Object(doc)) = response {
            if let Some(member) = doc.get(LINK_KEY).and_then(Value::as_str) {
                let member = member.to_string();
                let resource =
                    Resource::from_document(Arc::clone(&self.transport), Some(member), doc).await;
                return Ok(Created::Member(resource));
            }
        }

        tracing::debug!("create returned no member link, refreshing {}", address);
        self.refresh().await?;
        Ok(Created::Refreshed)
    }

    /// Re-fetch this resource and rebuild every attribute from the result
    pub async fn refresh(&mut self) -> Result<()> {
        let address = self.address.clone().ok_or(Error::MissingAddress("refresh"))?;
        let doc = fetch_document(self.transport.as_ref(), &address).await?;
        self.materialize(doc).await;
        Ok(())
    }

    /// PATCH `fields` (with the version token, if known), then refresh
    pub async fn update(&mut self, fields: Map<String, Value>) -> Result<()> {
        let address = self.address.clone().ok_or(Error::MissingAddress("PATCH"))?;
        self.ensure_materialized().await?;
        let version = self.version_token().map(str::to_string);

        tracing::info!("PATCH {} fields {:?}", address, fields.keys().collect::<Vec<_>>());
        self.transport
            .patch(&address, &Value::Object(fields), version.as_deref())
            .await?;
        self.refresh().await
    }

    /// DELETE this resource. The node is stale afterwards.
    pub async fn delete(&self) -> Result<()> {
        let address = self.address.as_deref().ok_or(Error::MissingAddress("DELETE"))?;
        tracing::info!("DELETE {}", address);
        self.transport.delete(address).await
    }
}

/// GET `address` and insist on a JSON object
async fn fetch_document(transport: &dyn Transport, address: &str) -> Result<Map<String, Value>> {
    tracing::debug!("fetch {}", address);
    match transport.get(address).await? {
        Value::Object(doc) => Ok(doc),
        other => Err(Error::Malformed {
            method: "GET",
            url: address.to_string(),
            reason: format!("a non-object document ({})", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Iterator over collection members
pub struct Members<'a> {
    transport: &'a Arc<dyn Transport>,
    entries: std::slice::Iter<'a, Value>,
}

impl Iterator for Members<'_> {
    type Item = Resource;

    fn next(&mut self) -> Option<Resource> {
        for entry in self.entries.by_ref() {
            let Value::Object(map) = entry else {
                tracing::warn!("skipping non-object collection member: {}", entry);
                continue;
            };
            let member = match map.get(LINK_KEY).and_then(Value::as_str) {
                Some(address) => Resource::stub(Arc::clone(self.transport), address),
                None => Resource::embedded(Arc::clone(self.transport), None, map.clone()),
            };
            return Some(member);
        }
        None
    }
}

fn type_of(raw: Option<&Map<String, Value>>) -> Option<&str> {
    raw?.get(TYPE_KEY)?.as_str()
}

/// `Id`, else `Name`, else the address
fn identity_of<'a>(raw: Option<&'a Map<String, Value>>, address: Option<&'a str>) -> Option<&'a str> {
    let field = |key: &str| raw.and_then(|raw| raw.get(key)).and_then(Value::as_str);
    field("Id").or_else(|| field("Name")).or(address)
}

/// `<Resource TYPE (IDENTITY)>`, computed from what is already known
fn label(raw: Option<&Map<String, Value>>, address: Option<&str>) -> String {
    format!(
        "<Resource {} ({})>",
        type_of(raw).unwrap_or("Resource"),
        identity_of(raw, address).unwrap_or("?")
    )
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&label(self.raw.as_ref(), self.address.as_deref()))
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("address", &self.address)
            .field("materialized", &self.materialized)
            .field("is_collection", &self.is_collection)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}
