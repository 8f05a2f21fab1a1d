//! Parsing of the lowered schema emitted by the upstream query compiler.
//!
//! The input is a plain-text document with two delimiter levels. Segments are
//! separated by a fixed delimiter line; the first three segments carry the
//! ambient metadata declarations and the upstream register inventory, and every
//! following non-blank segment describes one pipeline stage:
//!
//! ```text
//! =================================
//! bit<32> srcip;
//! bit<32> dstip;
//! =================================
//! bit<32> count;
//! =================================
//! [count]
//! =================================
//! flowcount
//!
//! GROUPBY
//! [srcip, dstip]
//! [count]
//! --
//! count = count + 1;
//! =================================
//! ```
//!
//! Parsing is single-pass and all-or-nothing: the first malformed segment
//! aborts the run with a [`FormatError`]. Nothing is ever recovered or
//! defaulted, since the input is machine-generated and a malformed document
//! means the upstream compiler broke its contract.

use std::collections::HashSet;

/// Delimiter line separating segments of the compiler output.
pub const STAGE_DELIMITER: &str = "=================================";

/// Delimiter separating a stage's metadata from its code fragment.
pub const CODE_DELIMITER: &str = "--";

/// Operation performed by a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Filter,
    Project,
    GroupBy,
    Zip,
    /// Keyword not recognized. Kept through parsing so the error can name the
    /// stage; rejected by the generator.
    Unknown,
}

impl OpKind {
    /// Maps an operation keyword to its kind. The match is exact and
    /// case-sensitive; anything else is `Unknown`.
    pub fn from_keyword(keyword: &str) -> OpKind {
        match keyword {
            "FILTER" => OpKind::Filter,
            "PROJECT" => OpKind::Project,
            "GROUPBY" => OpKind::GroupBy,
            "ZIP" => OpKind::Zip,
            _ => OpKind::Unknown,
        }
    }
}

/// One stage of the pipeline.
///
/// `key_fields` and `registers` are only meaningful for group-by stages; for
/// filter, project and zip stages only `code` matters.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub op: OpKind,
    /// Stage name, unique within a schema. Every generated identifier for the
    /// stage derives from it.
    pub name: String,
    /// Opaque code fragment, preserved verbatim apart from outer trimming.
    pub code: String,
    /// Grouping key field names, in declaration order.
    pub key_fields: Vec<String>,
    /// Aggregation state field names, in declaration order.
    pub registers: Vec<String>,
}

/// Parsed compiler output: ambient metadata declarations plus the ordered
/// stage list. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Declarations shared by every query, one `<type> <name>;` line each.
    pub common_meta: Vec<String>,
    /// Declarations specific to the compiled query.
    pub query_meta: Vec<String>,
    pub stages: Vec<Stage>,
}

/// Errors raised while parsing the compiler output.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    /// Fewer delimiter-separated segments than the fixed header requires
    TooFewSegments(usize),
    /// A metadata declaration line without `<type> <name>` tokens
    BadDeclaration(String),
    /// A stage segment with other than exactly one code delimiter
    BadStageSplit { stage: String, delimiters: usize },
    /// Stage metadata with fewer than the three mandatory lines
    TooFewMetaLines { stage: String, found: usize },
    /// Stage metadata with more than five lines
    TooManyMetaLines { stage: String, found: usize },
    /// The line between stage name and operation keyword was not blank
    SeparatorNotBlank { stage: String },
    /// A key-field list without a matching register list
    MissingRegisterList { stage: String },
    /// A field list that is not bracket-delimited
    UnbracketedList { stage: String, line: String },
    /// Two stages with the same name
    DuplicateStage(String),
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::TooFewSegments(found) => write!(
                f,
                "expected at least 5 delimiter-separated segments, found {}",
                found
            ),
            FormatError::BadDeclaration(line) => {
                write!(f, "malformed metadata declaration: '{}'", line)
            }
            FormatError::BadStageSplit { stage, delimiters } => write!(
                f,
                "stage '{}': expected exactly one '{}' delimiter, found {}",
                stage, CODE_DELIMITER, delimiters
            ),
            FormatError::TooFewMetaLines { stage, found } => write!(
                f,
                "stage '{}': expected at least 3 metadata lines, found {}",
                stage, found
            ),
            FormatError::TooManyMetaLines { stage, found } => write!(
                f,
                "stage '{}': expected at most 5 metadata lines, found {}",
                stage, found
            ),
            FormatError::SeparatorNotBlank { stage } => write!(
                f,
                "stage '{}': second metadata line must be blank",
                stage
            ),
            FormatError::MissingRegisterList { stage } => write!(
                f,
                "stage '{}': key-field list present but register list missing",
                stage
            ),
            FormatError::UnbracketedList { stage, line } => write!(
                f,
                "stage '{}': expected a bracket-delimited list, got '{}'",
                stage, line
            ),
            FormatError::DuplicateStage(name) => {
                write!(f, "duplicate stage name '{}'", name)
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// Extracts the declared name from a `<type> <name>;` metadata line.
pub(crate) fn declared_name(line: &str) -> Option<&str> {
    let name = line.split_whitespace().nth(1)?.trim_end_matches(';');
    if name.is_empty() { None } else { Some(name) }
}

fn parse_meta_block(block: &str) -> Result<Vec<String>, FormatError> {
    let mut lines = Vec::new();
    for line in block.trim().lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if declared_name(line).is_none() {
            return Err(FormatError::BadDeclaration(line.to_string()));
        }
        lines.push(line.to_string());
    }
    Ok(lines)
}

fn parse_bracket_list(line: &str, stage: &str) -> Result<Vec<String>, FormatError> {
    let line = line.trim();
    let inner = line
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| FormatError::UnbracketedList {
            stage: stage.to_string(),
            line: line.to_string(),
        })?;
    Ok(inner
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect())
}

/// Parses one non-blank stage segment.
///
/// The metadata part is a strict positional record: stage name, a blank
/// separator line, the operation keyword, and optionally the key-field and
/// register lists. Each line is validated for its role rather than consumed
/// blindly by index.
fn parse_stage(segment: &str) -> Result<Stage, FormatError> {
    let parts: Vec<&str> = segment.split(CODE_DELIMITER).collect();
    if parts.len() != 2 {
        let first_line = segment.trim().lines().next().unwrap_or("").to_string();
        return Err(FormatError::BadStageSplit {
            stage: first_line,
            delimiters: parts.len() - 1,
        });
    }
    let meta = parts[0].trim();
    let code = parts[1].trim().to_string();

    let lines: Vec<&str> = meta.lines().collect();
    let name = lines.first().map(|line| line.trim().to_string()).unwrap_or_default();
    if lines.len() < 3 {
        return Err(FormatError::TooFewMetaLines {
            stage: name,
            found: lines.len(),
        });
    }
    if lines.len() > 5 {
        return Err(FormatError::TooManyMetaLines {
            stage: name,
            found: lines.len(),
        });
    }
    if !lines[1].trim().is_empty() {
        return Err(FormatError::SeparatorNotBlank { stage: name });
    }
    let op = OpKind::from_keyword(lines[2].trim());

    let (key_fields, registers) = if lines.len() == 3 {
        (Vec::new(), Vec::new())
    } else if lines.len() == 4 {
        return Err(FormatError::MissingRegisterList { stage: name });
    } else {
        (
            parse_bracket_list(lines[3], &name)?,
            parse_bracket_list(lines[4], &name)?,
        )
    };

    Ok(Stage {
        op,
        name,
        code,
        key_fields,
        registers,
    })
}

impl Schema {
    /// Parses the complete compiler output.
    ///
    /// Segment layout: a blank lead-in, the common metadata block, the query
    /// metadata block, the upstream register inventory (ignored here), then
    /// one segment per stage. Blank stage segments are skipped; everything
    /// else must parse or the whole document is rejected.
    pub fn parse(input: &str) -> Result<Schema, FormatError> {
        let parts: Vec<&str> = input.split(STAGE_DELIMITER).collect();
        if parts.len() < 5 {
            return Err(FormatError::TooFewSegments(parts.len()));
        }
        let common_meta = parse_meta_block(parts[1])?;
        let query_meta = parse_meta_block(parts[2])?;

        let mut stages = Vec::new();
        let mut seen = HashSet::new();
        for segment in &parts[4..] {
            if segment.trim().is_empty() {
                continue;
            }
            let stage = parse_stage(segment)?;
            if !seen.insert(stage.name.clone()) {
                return Err(FormatError::DuplicateStage(stage.name));
            }
            stages.push(stage);
        }

        Ok(Schema {
            common_meta,
            query_meta,
            stages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_match_is_case_sensitive() {
        assert_eq!(OpKind::from_keyword("GROUPBY"), OpKind::GroupBy);
        assert_eq!(OpKind::from_keyword("groupby"), OpKind::Unknown);
        assert_eq!(OpKind::from_keyword("Filter"), OpKind::Unknown);
    }

    #[test]
    fn test_declared_name() {
        assert_eq!(declared_name("bit<32> srcip;"), Some("srcip"));
        assert_eq!(declared_name("bit<32>  tin ;"), Some("tin"));
        assert_eq!(declared_name("orphan"), None);
    }
}
