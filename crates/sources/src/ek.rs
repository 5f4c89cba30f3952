//! Elastic-style newline-delimited JSON (tshark `-T ek`) decoding
//!
//! Each packet is one line shaped like:
//!
//! ```text
//! {"timestamp":"1714566645123","layers":{
//!     "frame":{"frame_frame_len":"74","frame_frame_protocols":"eth:ethertype:ip:udp:dns"},
//!     "ip":{"ip_ip_src":"10.0.0.5","ip_ip_dst":"8.8.8.8"},
//!     "dns":{"dns_dns_qry_name":"example.com"},
//!     "frame_raw":"00112233..."}}
//! ```
//!
//! Bulk-index lines (`{"index":{...}}`) and blank lines carry no packet.
//! Field keys lose their `<layer>_<layer>_` prefix, so `ip_ip_src` becomes
//! `src` and `tcp_tcp_analysis_retransmission` becomes
//! `analysis_retransmission`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use sift_protocol::{DecodedPacket, Layer};

use crate::error::{Result, SourceError};

#[cfg(test)]
#[path = "ek_test.rs"]
mod tests;

/// Top-level key carrying raw frame bytes when `-x` is in effect
const FRAME_RAW_KEY: &str = "frame_raw";

/// Decode one line; `Ok(None)` for lines that carry no packet
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<DecodedPacket>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_str(line).map_err(|e| SourceError::malformed(line_no, e))?;
    let Value::Object(root) = value else {
        return Err(SourceError::malformed(line_no, "expected a JSON object"));
    };

    if root.contains_key("index") && !root.contains_key("layers") {
        return Ok(None);
    }

    let Some(Value::Object(layers)) = root.get("layers") else {
        return Err(SourceError::malformed(line_no, "missing layers object"));
    };

    let captured_at = root
        .get("timestamp")
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);

    let mut packet = DecodedPacket::new(captured_at);
    let mut protocols: Option<String> = None;

    for (key, value) in layers {
        match value {
            Value::Object(fields) => {
                let layer = decode_layer(key, fields);
                if layer.name() == "frame" {
                    packet.length = layer.parse_u64("len").and_then(|len| len.ok());
                    protocols = layer.get_non_empty("protocols").map(str::to_string);
                }
                packet.push_layer(layer);
            }
            Value::String(raw) if key == FRAME_RAW_KEY => {
                packet.frame_raw = hex::decode(raw).ok();
            }
            _ => {}
        }
    }

    if let Some(highest) = protocols.as_deref().and_then(|p| p.rsplit(':').next()) {
        packet.highest_layer = highest.to_ascii_uppercase();
    }

    Ok(Some(packet))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    DateTime::from_timestamp_millis(millis)
}

fn decode_layer(name: &str, fields: &Map<String, Value>) -> Layer {
    let mut layer = Layer::new(name);
    push_fields(&mut layer, name, fields);
    layer
}

fn push_fields(layer: &mut Layer, layer_name: &str, fields: &Map<String, Value>) {
    for (key, value) in fields {
        let field = field_name(layer_name, key);
        push_value(layer, layer_name, field, value);
    }
}

fn push_value(layer: &mut Layer, layer_name: &str, field: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => layer.push(field, s.as_str()),
        Value::Bool(b) => layer.push(field, b.to_string()),
        Value::Number(n) => layer.push(field, n.to_string()),
        Value::Array(items) => {
            for item in items {
                push_value(layer, layer_name, field, item);
            }
        }
        Value::Object(nested) => push_fields(layer, layer_name, nested),
    }
}

/// Strip `<layer>_<layer>_` (or `<layer>_`) from an EK key
pub fn field_name<'a>(layer: &str, key: &'a str) -> &'a str {
    let Some(rest) = strip_layer_prefix(key, layer) else {
        return key;
    };
    match strip_layer_prefix(rest, layer) {
        Some(inner) if !inner.is_empty() => inner,
        _ if !rest.is_empty() => rest,
        _ => key,
    }
}

fn strip_layer_prefix<'a>(key: &'a str, layer: &str) -> Option<&'a str> {
    let rest = key.strip_prefix(layer)?;
    rest.strip_prefix('_')
}
