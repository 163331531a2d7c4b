//! Materialization rules
//!
//! Turns one raw Redfish document into attributes. Conversion is one level
//! deep per pass: nested objects become unmaterialized resources that carry
//! their own data (or just a link), so a 50-level document costs one level
//! of work until someone walks down it.

use super::attribute::Attribute;
use super::node::Resource;
use super::transport::Transport;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Canonical address of a resource
pub const LINK_KEY: &str = "@odata.id";
pub const TYPE_KEY: &str = "@odata.type";
pub const CONTEXT_KEY: &str = "@odata.context";
/// Version token sent back as If-Match on writes
pub const ETAG_KEY: &str = "@odata.etag";

/// Metadata keys never exposed as plain attributes
pub const META_KEYS: [&str; 4] = [LINK_KEY, TYPE_KEY, CONTEXT_KEY, ETAG_KEY];

pub const MEMBERS_KEY: &str = "Members";
pub const OEM_KEY: &str = "Oem";
pub const LINKS_KEY: &str = "Links";
pub const ACTIONS_KEY: &str = "Actions";

/// Prefix of action declarations, e.g. `#ComputerSystem.Reset`
pub const ACTION_MARKER: char = '#';

/// Suffix of `<Property>@Redfish.AllowableValues` fields
pub const ALLOWABLE_VALUES_SUFFIX: &str = "@Redfish.AllowableValues";

pub fn is_meta(key: &str) -> bool {
    META_KEYS.contains(&key)
}

/// True if `key` can be exposed as an attribute (`[A-Za-z_][A-Za-z0-9_]*`)
pub fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Convert one raw value into an attribute without fetching anything
pub fn convert(transport: &Arc<dyn Transport>, value: &Value) -> Attribute {
    match value {
        Value::Object(map) => {
            let address = map.get(LINK_KEY).and_then(Value::as_str);
            match address {
                Some(address) if map.len() == 1 => {
                    Resource::stub(Arc::clone(transport), address).into()
                },
                _ => Resource::embedded(
                    Arc::clone(transport),
                    address.map(str::to_string),
                    map.clone(),
                )
                .into(),
            }
        },
        Value::Array(items) => {
            Attribute::List(items.iter().map(|item| convert(transport, item)).collect())
        },
        other => Attribute::Value(other.clone()),
    }
}

/// Map every non-metadata, attribute-valid field of `doc`
pub(crate) fn map_standard(
    transport: &Arc<dyn Transport>,
    doc: &Map<String, Value>,
    attributes: &mut BTreeMap<String, Attribute>,
) -> usize {
    let mut mapped = 0;
    for (key, value) in doc {
        if is_meta(key) || !is_identifier(key) {
            continue;
        }
        attributes.insert(key.clone(), convert(transport, value));
        mapped += 1;
    }
    mapped
}

/// Promote vendor fields from `Oem.<Vendor>` onto the resource.
///
/// Existing names always win, so standard fields beat vendor fields and the
/// first vendor in document order beats later ones.
pub(crate) fn surface_oem(
    transport: &Arc<dyn Transport>,
    doc: &Map<String, Value>,
    attributes: &mut BTreeMap<String, Attribute>,
) -> usize {
    let Some(Value::Object(oem)) = doc.get(OEM_KEY) else {
        return 0;
    };

    let mut surfaced = 0;
    for vendor_data in oem.values() {
        let Value::Object(vendor_data) = vendor_data else {
            continue;
        };
        for (key, value) in vendor_data {
            if key.starts_with(ACTION_MARKER)
                || !is_identifier(key)
                || attributes.contains_key(key)
            {
                continue;
            }
            attributes.insert(key.clone(), convert(transport, value));
            surfaced += 1;
        }
    }
    surfaced
}

/// Promote relationship links from `Links` onto the resource.
///
/// A nested `Links.Oem` block is not surfaced at all.
pub(crate) fn surface_links(
    transport: &Arc<dyn Transport>,
    doc: &Map<String, Value>,
    attributes: &mut BTreeMap<String, Attribute>,
) -> usize {
    let Some(Value::Object(links)) = doc.get(LINKS_KEY) else {
        return 0;
    };

    let mut surfaced = 0;
    for (key, value) in links {
        if key == OEM_KEY || is_meta(key) || !is_identifier(key) || attributes.contains_key(key) {
            continue;
        }
        attributes.insert(key.clone(), convert(transport, value));
        surfaced += 1;
    }
    surfaced
}
