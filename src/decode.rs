//! Offline decoding of diagnostic register dumps.
//!
//! The target runtime reports each backing-store row as a pair of lines of
//! the form `kvKeys[3]=281479271743489` and `kvValues[3]=65538`. Each row
//! packs several fixed-width keys or values into one number; this module
//! unpacks them and pairs key chunk i with value chunk i. Pure log
//! post-processing, with no view into the generator.

use std::collections::BTreeMap;

use regex::Regex;

const SUB_PART_SEPARATOR: &str = ".";

/// A dump line that matched the register pattern but carried a number that
/// does not parse.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    BadIndex(String),
    BadValue(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::BadIndex(line) => write!(f, "invalid register index in '{}'", line),
            DecodeError::BadValue(line) => write!(f, "invalid register value in '{}'", line),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decoder configuration.
#[derive(Debug, Clone)]
pub struct DecodeConfig {
    /// Width of each packed key chunk, in bits.
    pub key_width: u32,
    /// Width of each packed value chunk, in bits.
    pub value_width: u32,
    /// Bits per key sub-part for dotted display. Zero disables splitting;
    /// eight renders an address-like key byte by byte.
    pub sub_key_width: u32,
    /// Name of the register holding packed keys.
    pub key_register: String,
    /// Name of the register holding packed values.
    pub value_register: String,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        DecodeConfig {
            key_width: 16,
            value_width: 16,
            sub_key_width: 0,
            key_register: "kvKeys".to_string(),
            value_register: "kvValues".to_string(),
        }
    }
}

/// One decoded key/value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Formatted key, dotted into sub-parts when configured.
    pub key: String,
    pub value: u64,
}

pub struct Decoder {
    config: DecodeConfig,
    line: Regex,
}

impl Decoder {
    pub fn new(config: DecodeConfig) -> Decoder {
        Decoder {
            config,
            line: Regex::new(r"^([A-Za-z]+)\[([0-9]+)\]=(.*)$").expect("dump line pattern"),
        }
    }

    /// Decodes a complete dump. Lines that do not look like register reads
    /// are ignored; rows whose packed key is zero are empty and skipped.
    /// Rows are emitted in index order, so equal dumps decode equally.
    pub fn decode(&self, input: &str) -> Result<Vec<Entry>, DecodeError> {
        let mut keys: BTreeMap<u64, u64> = BTreeMap::new();
        let mut values: BTreeMap<u64, u64> = BTreeMap::new();
        for raw in input.lines() {
            let raw = raw.trim();
            let caps = match self.line.captures(raw) {
                Some(caps) => caps,
                None => continue,
            };
            let index: u64 = caps[2]
                .parse()
                .map_err(|_| DecodeError::BadIndex(raw.to_string()))?;
            let value: u64 = caps[3]
                .trim()
                .parse()
                .map_err(|_| DecodeError::BadValue(raw.to_string()))?;
            if &caps[1] == self.config.key_register {
                keys.insert(index, value);
            } else if &caps[1] == self.config.value_register {
                values.insert(index, value);
            }
        }

        let mut entries = Vec::new();
        for (index, packed_key) in keys {
            if packed_key == 0 {
                continue;
            }
            let key_parts = split_chunks(packed_key, self.config.key_width);
            let value_parts =
                split_chunks(values.get(&index).copied().unwrap_or(0), self.config.value_width);
            for (i, part) in key_parts.iter().enumerate() {
                entries.push(Entry {
                    key: self.format_key(*part),
                    value: value_parts.get(i).copied().unwrap_or(0),
                });
            }
        }
        Ok(entries)
    }

    /// Renders entries as `key:<tab>value` lines.
    pub fn format(&self, entries: &[Entry]) -> String {
        let mut out = String::new();
        for entry in entries {
            out.push_str(&entry.key);
            out.push_str(":\t");
            out.push_str(&entry.value.to_string());
            out.push('\n');
        }
        out
    }

    /// Renders entries as one JSON object, formatted key to value.
    pub fn to_json(&self, entries: &[Entry]) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for entry in entries {
            map.insert(entry.key.clone(), serde_json::Value::from(entry.value));
        }
        serde_json::Value::Object(map)
    }

    fn format_key(&self, key: u64) -> String {
        if self.config.sub_key_width == 0 {
            return key.to_string();
        }
        if key == 0 {
            return "0".to_string();
        }
        let mut parts = split_chunks(key, self.config.sub_key_width);
        parts.reverse();
        parts
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(SUB_PART_SEPARATOR)
    }
}

/// Splits a packed number into width-sized chunks from the least significant
/// bit up, stopping once the remainder is zero.
fn split_chunks(mut packed: u64, width: u32) -> Vec<u64> {
    let mut parts = Vec::new();
    if width == 0 || width >= 64 {
        if packed != 0 {
            parts.push(packed);
        }
        return parts;
    }
    let mask = (1u64 << width) - 1;
    while packed != 0 {
        parts.push(packed & mask);
        packed >>= width;
    }
    parts
}
