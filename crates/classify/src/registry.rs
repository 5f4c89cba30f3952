//! Summarizer registry - protocol tag to payload summary function
//!
//! Each summarizer is a small pure function that reads the fields it knows
//! about and tolerates every one of them being absent. `Ok(None)` means the
//! packet carried nothing worth summarizing and the classifier should try
//! its fallbacks.
//!
//! # Example
//!
//! ```
//! use sift_classify::SummarizerRegistry;
//!
//! let registry = SummarizerRegistry::with_defaults();
//! assert!(registry.contains("dns"));
//! assert!(registry.get("GOPHER").is_none());
//! ```

use std::collections::HashMap;

use sift_protocol::DecodedPacket;

use crate::error::Result;
use crate::summaries;

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Payload summary function for one protocol tag
pub type Summarizer = fn(&DecodedPacket) -> Result<Option<String>>;

/// Maps uppercase protocol tags (`DNS`, `MODBUS`) to summarizers
#[derive(Clone, Default)]
pub struct SummarizerRegistry {
    summarizers: HashMap<String, Summarizer>,
}

impl SummarizerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in summarizer
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("UDP", summaries::udp);
        registry.register("HTTP", summaries::http);
        registry.register("MDNS", summaries::mdns);
        registry.register("ICMP", summaries::icmp);
        registry.register("DNS", summaries::dns);
        registry.register("ARP", summaries::arp);
        registry.register("MODBUS", summaries::modbus);
        registry.register("DNP3", summaries::dnp3);
        registry.register("S7COMM", summaries::s7comm);
        registry.register("TCP", summaries::tcp);
        registry
    }

    /// Register a summarizer, returning the one it replaced
    pub fn register(&mut self, tag: &str, summarizer: Summarizer) -> Option<Summarizer> {
        self.summarizers.insert(tag.to_ascii_uppercase(), summarizer)
    }

    /// Register only if the tag is free
    ///
    /// Returns `false` if a summarizer is already registered for this tag.
    pub fn try_register(&mut self, tag: &str, summarizer: Summarizer) -> bool {
        let tag = tag.to_ascii_uppercase();
        if self.summarizers.contains_key(&tag) {
            return false;
        }
        self.summarizers.insert(tag, summarizer);
        true
    }

    /// Look up the summarizer for a tag (case-insensitive)
    pub fn get(&self, tag: &str) -> Option<Summarizer> {
        self.summarizers.get(&tag.to_ascii_uppercase()).copied()
    }

    /// Whether a tag has a summarizer
    pub fn contains(&self, tag: &str) -> bool {
        self.summarizers.contains_key(&tag.to_ascii_uppercase())
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.summarizers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.summarizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summarizers.is_empty()
    }
}

impl std::fmt::Debug for SummarizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizerRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
