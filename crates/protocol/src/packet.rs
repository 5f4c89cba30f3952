//! Decoded packet model
//!
//! A `DecodedPacket` is what a capture source hands to the pipeline: a packet
//! already dissected into an ordered list of protocol layers, each holding
//! named string fields in the order the dissector reported them. The pipeline
//! never parses raw bytes itself except for the printable fallback summary.

use chrono::{DateTime, Utc};

use crate::error::ProtocolError;

/// Layer names treated as the transport layer when building a packet
const TRANSPORT_LAYERS: &[&str] = &["tcp", "udp", "sctp", "dccp"];

/// One dissected protocol layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    /// Lowercase layer name (`ip`, `tcp`, `dns`, ...)
    name: String,
    /// Fields in declaration order
    fields: Vec<(String, String)>,
}

impl Layer {
    /// Create an empty layer
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().to_ascii_lowercase(),
            fields: Vec::new(),
        }
    }

    /// Builder-style field append
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a field, keeping declaration order
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Layer name (lowercase)
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterate `(name, value)` pairs in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Number of fields
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the layer carries no fields
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First value recorded for `name` (case-insensitive), possibly empty
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values recorded for `name`; dissectors repeat fields for lists
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value for `name` if present and not blank
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    /// First field with a non-blank value, in declaration order
    pub fn first_non_empty(&self) -> Option<(&str, &str)> {
        self.fields().find(|(_, v)| !v.trim().is_empty())
    }

    /// Parse a field as an unsigned integer (decimal or `0x` hex)
    pub fn parse_u64(&self, name: &str) -> Option<crate::Result<u64>> {
        self.get_non_empty(name).map(|value| {
            parse_u64_value(value).ok_or_else(|| ProtocolError::invalid_integer(name, value))
        })
    }

    /// Decode a hex field, tolerating `:` separators (`de:ad:be:ef`)
    pub fn bytes(&self, name: &str) -> Option<crate::Result<Vec<u8>>> {
        self.get_non_empty(name).map(|value| {
            let compact: String = value.chars().filter(|c| *c != ':').collect();
            hex::decode(compact.trim()).map_err(|e| ProtocolError::invalid_hex(name, e))
        })
    }
}

/// Parse `"42"` or `"0x2a"` into an integer
pub(crate) fn parse_u64_value(value: &str) -> Option<u64> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// A packet dissected into named layers
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket {
    /// Capture timestamp
    pub captured_at: DateTime<Utc>,
    /// Wire length in bytes, if the dissector reported one
    pub length: Option<u64>,
    /// Highest detected protocol, uppercase (`DNS`, `TLS`, `TCP`)
    pub highest_layer: String,
    /// Transport layer name, uppercase (`TCP`, `UDP`)
    pub transport_layer: Option<String>,
    /// Layers from the link layer upwards
    pub layers: Vec<Layer>,
    /// Raw frame bytes, when the source captured them
    pub frame_raw: Option<Vec<u8>>,
}

impl DecodedPacket {
    /// Create an empty packet captured at `captured_at`
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            length: None,
            highest_layer: String::new(),
            transport_layer: None,
            layers: Vec::new(),
            frame_raw: None,
        }
    }

    /// Set the wire length
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Append a layer
    ///
    /// The most recently added layer becomes the highest layer, and transport
    /// layers (`tcp`, `udp`, ...) set `transport_layer`. Call
    /// `with_highest_layer` afterwards to override.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.push_layer(layer);
        self
    }

    /// Append a layer in place (same rules as `with_layer`)
    pub fn push_layer(&mut self, layer: Layer) {
        self.highest_layer = layer.name().to_ascii_uppercase();
        if TRANSPORT_LAYERS.contains(&layer.name()) {
            self.transport_layer = Some(layer.name().to_ascii_uppercase());
        }
        self.layers.push(layer);
    }

    /// Override the reported highest layer
    pub fn with_highest_layer(mut self, name: impl AsRef<str>) -> Self {
        self.highest_layer = name.as_ref().to_ascii_uppercase();
        self
    }

    /// Attach raw frame bytes
    pub fn with_frame_raw(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.frame_raw = Some(bytes.into());
        self
    }

    /// Find a layer by name (case-insensitive)
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|l| l.name().eq_ignore_ascii_case(name))
    }

    /// Whether a layer is present
    #[inline]
    pub fn has_layer(&self, name: &str) -> bool {
        self.layer(name).is_some()
    }

    /// Field lookup across a named layer
    pub fn field(&self, layer: &str, field: &str) -> Option<&str> {
        self.layer(layer).and_then(|l| l.get(field))
    }

    /// The layer named by `transport_layer`
    pub fn transport(&self) -> Option<&Layer> {
        self.transport_layer
            .as_deref()
            .and_then(|name| self.layer(name))
    }

    /// The network layer carrying addresses (`ip`, then `ipv6`)
    pub fn network(&self) -> Option<&Layer> {
        self.layer("ip").or_else(|| self.layer("ipv6"))
    }
}
