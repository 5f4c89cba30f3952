//! Display filters - Wireshark-style predicates over decoded packets
//!
//! Applied by the ingestion worker when the capture source cannot filter on
//! its own (replay files, injected packets). Live dissector sources receive
//! the filter text directly.
//!
//! # Syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `dns` | packet has a `dns` layer |
//! | `tcp.analysis_retransmission` | field present and non-empty |
//! | `ip.src == 10.0.0.1` | any value of the field compares true |
//! | `ip.addr == 10.0.0.1` | source or destination address |
//! | `tcp.port == 443` / `udp.port == 53` | source or destination port |
//! | `frame.len > 1000` | wire length |
//! | `http.host contains "example"` | substring |
//! | `a and b`, `a or b`, `not a`, `( ... )` | boolean logic (`&&`, `||`, `!`) |
//!
//! Comparisons are numeric when both sides parse as numbers (decimal or
//! `0x` hex), otherwise string comparisons. `!=` holds when the field is
//! present and no value equals the operand.
//!
//! # Example
//!
//! ```
//! use sift_classify::DisplayFilter;
//!
//! let filter: DisplayFilter = "tcp.port == 443 or dns".parse().unwrap();
//! assert!(!filter.is_match_all());
//! assert!(DisplayFilter::parse("").unwrap().is_match_all());
//! ```

mod lexer;
mod parser;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use sift_protocol::DecodedPacket;

pub use lexer::CmpOp;
use parser::{Expr, Parser};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Errors produced while parsing a display filter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { pos: usize, found: String },

    #[error("unexpected end of filter")]
    UnexpectedEnd,

    #[error("unterminated string starting at position {pos}")]
    UnterminatedString { pos: usize },

    #[error("invalid character '{ch}' at position {pos}")]
    InvalidCharacter { pos: usize, ch: char },

    #[error("filter nests deeper than {max} levels at position {pos}")]
    TooDeep { pos: usize, max: usize },
}

/// A parsed display filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFilter {
    text: String,
    expr: Option<Expr>,
}

impl DisplayFilter {
    /// Parse filter text; blank text matches every packet
    pub fn parse(text: &str) -> Result<Self, FilterError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::match_all());
        }

        let tokens = lexer::tokenize(text)?;
        let expr = Parser::new(tokens).parse()?;
        Ok(Self {
            text: text.to_string(),
            expr: Some(expr),
        })
    }

    /// Filter that accepts everything
    pub fn match_all() -> Self {
        Self {
            text: String::new(),
            expr: None,
        }
    }

    #[inline]
    pub fn is_match_all(&self) -> bool {
        self.expr.is_none()
    }

    /// The normalized filter text
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Evaluate against a packet
    pub fn matches(&self, packet: &DecodedPacket) -> bool {
        match &self.expr {
            None => true,
            Some(expr) => eval(expr, packet),
        }
    }
}

impl Default for DisplayFilter {
    fn default() -> Self {
        Self::match_all()
    }
}

impl FromStr for DisplayFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DisplayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn eval(expr: &Expr, packet: &DecodedPacket) -> bool {
    match expr {
        Expr::And(terms) => terms.iter().all(|t| eval(t, packet)),
        Expr::Or(terms) => terms.iter().any(|t| eval(t, packet)),
        Expr::Not(inner) => !eval(inner, packet),
        Expr::Present(field) => {
            if field.contains('.') {
                field_values(packet, field).iter().any(|v| !v.is_empty())
            } else {
                packet.has_layer(field)
            }
        }
        Expr::Compare { field, op, value } => {
            let values = field_values(packet, field);
            match op {
                CmpOp::Ne => !values.is_empty() && values.iter().all(|v| !compare(v, CmpOp::Eq, value)),
                _ => values.iter().any(|v| compare(v, *op, value)),
            }
        }
    }
}

/// Every value a field name resolves to on this packet
fn field_values(packet: &DecodedPacket, field: &str) -> Vec<String> {
    let Some((layer_name, rest)) = field.split_once('.') else {
        return Vec::new();
    };

    match (layer_name, rest) {
        ("frame", "len" | "length") => packet.length.map(|l| l.to_string()).into_iter().collect(),
        ("ip" | "ipv6", "addr") => packet
            .layer(layer_name)
            .map(|l| {
                l.get_all("src")
                    .chain(l.get_all("dst"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        ("tcp" | "udp", "port") => packet
            .layer(layer_name)
            .map(|l| {
                l.get_all("srcport")
                    .chain(l.get_all("dstport"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        _ => {
            let Some(layer) = packet.layer(layer_name) else {
                return Vec::new();
            };
            let flat = rest.replace('.', "_");
            let mut values: Vec<String> = layer.get_all(&flat).map(str::to_string).collect();
            if values.is_empty() && flat != rest {
                values = layer.get_all(rest).map(str::to_string).collect();
            }
            values
        }
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    text.parse::<f64>().ok()
}

fn compare(actual: &str, op: CmpOp, expected: &str) -> bool {
    if op == CmpOp::Contains {
        return actual.contains(expected);
    }

    if let (Some(a), Some(b)) = (parse_number(actual), parse_number(expected)) {
        return match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Gt => a > b,
            CmpOp::Lt => a < b,
            CmpOp::Ge => a >= b,
            CmpOp::Le => a <= b,
            CmpOp::Contains => false,
        };
    }

    match op {
        CmpOp::Eq => actual.eq_ignore_ascii_case(expected),
        CmpOp::Ne => !actual.eq_ignore_ascii_case(expected),
        CmpOp::Gt => actual > expected,
        CmpOp::Lt => actual < expected,
        CmpOp::Ge => actual >= expected,
        CmpOp::Le => actual <= expected,
        CmpOp::Contains => false,
    }
}
