//! Resolution of logical field names to the physical expressions that read
//! them from the target program's ambient state.

use std::collections::HashMap;

use crate::schema::{declared_name, Schema};

/// Built-in fields available to every query, regardless of what the compiler
/// declared. The transport-port reads guard on header validity and fall back
/// to zero, since not every packet carries a transport header.
const BUILT_IN_SOURCES: &[(&str, &str)] = &[
    ("ingress_timestamp", "meta.intrinsic_meta.global_ingress_timestamp"),
    ("enq_queue_size", "(bit<32>)meta.queueing_meta.enq_qdepth"),
    ("deq_queue_size", "(bit<32>)meta.queueing_meta.deq_qdepth"),
    ("queue_time", "meta.queueing_meta.deq_timedelta"),
    ("srcip", "hdrs.ip.srcAddr"),
    ("dstip", "hdrs.ip.dstAddr"),
    ("srcport", "hdrs.tcp.isValid() ? (bit<32>)hdrs.tcp.srcPort : 0"),
    ("dstport", "hdrs.tcp.isValid() ? (bit<32>)hdrs.tcp.dstPort : 0"),
    ("proto", "(bit<32>)hdrs.ip.protocol"),
    ("pktlen", "(bit<32>)hdrs.ip.totalLen"),
    ("ingress_port", "(bit<32>)standard_meta.ingress_port"),
    ("egress_port", "(bit<32>)standard_meta.egress_port"),
];

/// A grouping key field that no declaration or built-in provides.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLookupError {
    pub field: String,
    pub stage: String,
}

impl std::fmt::Display for FieldLookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no source for key field '{}' in stage '{}': not declared in metadata and not a built-in",
            self.field, self.stage
        )
    }
}

impl std::error::Error for FieldLookupError {}

/// Table mapping each logical field name to the expression that reads it.
///
/// Built once per run from the schema's metadata declarations and the fixed
/// built-in set, then read-only. On a name collision the later entry wins:
/// query metadata shadows common metadata, and built-ins shadow both.
#[derive(Debug, Clone)]
pub struct FieldSourceMap {
    sources: HashMap<String, String>,
}

impl FieldSourceMap {
    pub fn build(schema: &Schema) -> FieldSourceMap {
        let mut sources = HashMap::new();
        for line in &schema.common_meta {
            if let Some(name) = declared_name(line) {
                sources.insert(name.to_string(), format!("meta.common_meta.{}", name));
            }
        }
        for line in &schema.query_meta {
            if let Some(name) = declared_name(line) {
                sources.insert(name.to_string(), format!("meta.query_meta.{}", name));
            }
        }
        for (name, source) in BUILT_IN_SOURCES {
            sources.insert(name.to_string(), source.to_string());
        }
        FieldSourceMap { sources }
    }

    /// Looks up the physical expression for a field, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }

    /// Looks up the physical expression for a grouping key field of `stage`.
    pub fn resolve(&self, name: &str, stage: &str) -> Result<&str, FieldLookupError> {
        self.get(name).ok_or_else(|| FieldLookupError {
            field: name.to_string(),
            stage: stage.to_string(),
        })
    }
}
