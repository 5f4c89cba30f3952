//! Record filter for tap subscriptions
//!
//! # Filter Logic
//!
//! - All filters are optional (None = match all)
//! - Multiple values in a filter are OR'd (match any)
//! - Different filters are AND'd (must match all specified filters)
//!
//! Protocol tags compare case-insensitively; an address matches a record
//! when it is either the source or the destination.
//!
//! # Example
//!
//! ```
//! use sift_tap::TapFilter;
//!
//! // DNS or ICMP traffic to or from the resolver
//! let filter = TapFilter::new()
//!     .with_protocols(["dns", "icmp"])
//!     .with_addresses(["192.168.1.1"]);
//! ```

use std::collections::HashSet;

use sift_protocol::{PacketRecord, RecordBatch};

use crate::SubscribeRequest;

/// Per-subscriber record filter
#[derive(Debug, Clone, Default)]
pub struct TapFilter {
    /// Uppercased protocol tags (None = match all)
    protocols: Option<HashSet<String>>,
    /// Addresses (None = match all)
    addresses: Option<HashSet<String>>,
}

impl TapFilter {
    /// Create an empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create filter from a subscribe request
    pub fn from_subscribe(req: &SubscribeRequest) -> Self {
        let mut filter = Self::new();
        if let Some(protocols) = &req.protocols {
            filter = filter.with_protocols(protocols);
        }
        if let Some(addresses) = &req.addresses {
            filter = filter.with_addresses(addresses);
        }
        filter
    }

    pub fn with_protocols<S: AsRef<str>>(mut self, protocols: impl IntoIterator<Item = S>) -> Self {
        self.protocols = Some(
            protocols
                .into_iter()
                .map(|p| p.as_ref().trim().to_ascii_uppercase())
                .collect(),
        );
        self
    }

    pub fn with_addresses<S: AsRef<str>>(mut self, addresses: impl IntoIterator<Item = S>) -> Self {
        self.addresses = Some(
            addresses
                .into_iter()
                .map(|a| a.as_ref().trim().to_string())
                .collect(),
        );
        self
    }

    /// Check if filter is empty (matches everything)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.protocols.is_none() && self.addresses.is_none()
    }

    /// Check if a record matches this filter
    pub fn matches(&self, record: &PacketRecord) -> bool {
        if let Some(protocols) = &self.protocols
            && !protocols.contains(&record.protocol.to_ascii_uppercase())
        {
            return false;
        }

        if let Some(addresses) = &self.addresses
            && !addresses.contains(&record.source_addr)
            && !addresses.contains(&record.dest_addr)
        {
            return false;
        }

        true
    }

    /// The matching part of `batch`; `None` when nothing matches
    ///
    /// An empty filter returns the same batch without copying.
    pub fn apply(&self, batch: &RecordBatch) -> Option<RecordBatch> {
        if self.is_empty() {
            return (!batch.is_empty()).then(|| RecordBatch::clone(batch));
        }
        let matching: Vec<PacketRecord> = batch.iter().filter(|r| self.matches(r)).cloned().collect();
        (!matching.is_empty()).then(|| RecordBatch::from(matching))
    }

    pub fn protocols(&self) -> Option<&HashSet<String>> {
        self.protocols.as_ref()
    }

    pub fn addresses(&self) -> Option<&HashSet<String>> {
        self.addresses.as_ref()
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
