//! Built-in protocol summarizers
//!
//! Field names follow the dissector's naming (`qry_name`, `func_code`,
//! `param_setup_rack_num`). Every function returns `Ok(None)` when none of
//! its fields are present.

use sift_protocol::{DecodedPacket, Layer, printable_bytes, truncate_chars};

use crate::error::Result;

#[cfg(test)]
#[path = "summaries_test.rs"]
mod tests;

/// Layers whose content is opaque to the classifier
pub const OPAQUE_LAYERS: &[&str] = &["tls", "quic", "llmnr", "ssdp"];

/// Longest value taken from an opaque layer
const OPAQUE_VALUE_LEN: usize = 50;

/// Bytes of raw frame rendered by the fallback
const RAW_FRAME_PREVIEW: usize = 30;

/// TCP flag bits in display order
const TCP_FLAGS: &[(u64, &str)] = &[
    (0x01, "FIN"),
    (0x02, "SYN"),
    (0x04, "RST"),
    (0x08, "PSH"),
    (0x10, "ACK"),
    (0x20, "URG"),
];

/// `Label: value` for each present field, in the given order
fn labeled(layer: &Layer, fields: &[(&str, &str)]) -> Vec<String> {
    fields
        .iter()
        .filter_map(|(field, label)| {
            layer
                .get_non_empty(field)
                .map(|value| format!("{label}: {value}"))
        })
        .collect()
}

fn joined(parts: Vec<String>) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn labeled_summary(
    packet: &DecodedPacket,
    layer: &str,
    fields: &[(&str, &str)],
) -> Result<Option<String>> {
    Ok(packet
        .layer(layer)
        .and_then(|layer| joined(labeled(layer, fields))))
}

/// `<field>: <value[:50]>` from the first non-empty field of an opaque layer
pub fn opaque(packet: &DecodedPacket) -> Option<String> {
    OPAQUE_LAYERS
        .iter()
        .filter_map(|name| packet.layer(name))
        .find_map(|layer| layer.first_non_empty())
        .map(|(field, value)| format!("{field}: {}", truncate_chars(value, OPAQUE_VALUE_LEN)))
}

/// `Len: <udp.length>`
pub fn udp(packet: &DecodedPacket) -> Result<Option<String>> {
    Ok(packet
        .layer("udp")
        .and_then(|udp| udp.get_non_empty("length"))
        .map(|len| format!("Len: {len}")))
}

pub fn http(packet: &DecodedPacket) -> Result<Option<String>> {
    labeled_summary(
        packet,
        "http",
        &[
            ("request_method", "Method"),
            ("request_uri", "URI"),
            ("response_code", "Status"),
            ("host", "Host"),
        ],
    )
}

pub fn mdns(packet: &DecodedPacket) -> Result<Option<String>> {
    labeled_summary(
        packet,
        "mdns",
        &[
            ("qry_name", "Query Name"),
            ("qry_type", "Query Type"),
            ("a", "Answer"),
        ],
    )
}

pub fn icmp(packet: &DecodedPacket) -> Result<Option<String>> {
    labeled_summary(packet, "icmp", &[("type", "Type"), ("code", "Code")])
}

/// `Query|Response, Name: .., Answer: ..` (answer only on responses)
pub fn dns(packet: &DecodedPacket) -> Result<Option<String>> {
    let Some(dns) = packet.layer("dns") else {
        return Ok(None);
    };

    let is_response = matches!(
        dns.get("flags_response").map(str::trim),
        Some("1" | "true" | "True")
    );

    let mut parts = vec![if is_response { "Response" } else { "Query" }.to_string()];
    if let Some(name) = dns.get_non_empty("qry_name") {
        parts.push(format!("Name: {name}"));
    }
    if is_response && let Some(answer) = dns.get_non_empty("a") {
        parts.push(format!("Answer: {answer}"));
    }
    Ok(joined(parts))
}

/// `who-has|is-at, Sender: .., Target: ..`
///
/// A non-numeric opcode is an error; the classifier renders it as
/// `Error: ...`.
pub fn arp(packet: &DecodedPacket) -> Result<Option<String>> {
    let Some(arp) = packet.layer("arp") else {
        return Ok(None);
    };

    let mut parts = Vec::new();
    if let Some(opcode) = arp.parse_u64("opcode") {
        parts.push(if opcode? == 1 { "who-has" } else { "is-at" }.to_string());
    }
    parts.extend(labeled(
        arp,
        &[("src_proto_ipv4", "Sender"), ("dst_proto_ipv4", "Target")],
    ));
    Ok(joined(parts))
}

pub fn modbus(packet: &DecodedPacket) -> Result<Option<String>> {
    labeled_summary(
        packet,
        "modbus",
        &[
            ("func_code", "Code"),
            ("exception_code", "Exception"),
            ("transaction_id", "Transaction ID"),
        ],
    )
}

pub fn dnp3(packet: &DecodedPacket) -> Result<Option<String>> {
    labeled_summary(
        packet,
        "dnp3",
        &[("ctl_func", "Code"), ("al_obj", "Object"), ("al_class", "Class")],
    )
}

pub fn s7comm(packet: &DecodedPacket) -> Result<Option<String>> {
    labeled_summary(
        packet,
        "s7comm",
        &[
            ("param_func", "Code"),
            ("param_setup_rack_num", "Rack"),
            ("param_setup_slot_num", "Slot"),
            ("item_data_type", "Data Type"),
        ],
    )
}

/// Symbolic flag set for a TCP flags value, `[PSH,ACK]`
///
/// Returns `None` for an unparseable value or when no known bit is set.
pub fn tcp_flags(value: &str) -> Option<String> {
    let value = value.trim();
    let hex = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    let bits = u64::from_str_radix(hex, 16).ok()?;

    let names: Vec<&str> = TCP_FLAGS
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, name)| *name)
        .collect();

    if names.is_empty() {
        None
    } else {
        Some(format!("[{}]", names.join(",")))
    }
}

/// `[FLAGS], seq=.., ack=.., win=.., Retransmission`
pub fn tcp(packet: &DecodedPacket) -> Result<Option<String>> {
    let Some(tcp) = packet.layer("tcp") else {
        return Ok(None);
    };

    let mut parts = Vec::new();
    if let Some(flags) = tcp.get_non_empty("flags").and_then(tcp_flags) {
        parts.push(flags);
    }
    for (field, label) in [("seq", "seq"), ("ack", "ack"), ("window_size", "win")] {
        if let Some(value) = tcp.get_non_empty(field) {
            parts.push(format!("{label}={value}"));
        }
    }
    if tcp.get("analysis_retransmission").is_some() {
        parts.push("Retransmission".to_string());
    }
    Ok(joined(parts))
}

/// `<field>: <value>` from the first non-empty field of the named layer
pub fn first_field(packet: &DecodedPacket, layer: &str) -> Option<String> {
    packet
        .layer(layer)
        .and_then(Layer::first_non_empty)
        .map(|(field, value)| format!("{field}: {value}"))
}

/// First 30 printable-sanitized bytes of the raw frame
pub fn raw_frame(packet: &DecodedPacket) -> Option<String> {
    let raw = packet.frame_raw.as_deref().filter(|raw| !raw.is_empty())?;
    let preview = printable_bytes(&raw[..raw.len().min(RAW_FRAME_PREVIEW)]);
    if raw.len() > RAW_FRAME_PREVIEW {
        Some(format!("{preview}..."))
    } else {
        Some(preview)
    }
}
