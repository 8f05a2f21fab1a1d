//! Decode a diagnostic register dump into readable key/value pairs

use super::CliError;
use crate::decode::{DecodeConfig, Decoder};

/// Options for the decode command
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Raw dump text, one register read per line
    pub dump: String,
    pub config: DecodeConfig,
    /// Emit a JSON object instead of text lines
    pub json: bool,
}

pub fn execute_decode(options: &DecodeOptions) -> Result<String, CliError> {
    let decoder = Decoder::new(options.config.clone());
    let entries = decoder.decode(&options.dump)?;
    if options.json {
        let mut out = decoder.to_json(&entries).to_string();
        out.push('\n');
        Ok(out)
    } else {
        Ok(decoder.format(&entries))
    }
}
