//! Per-stage code generation.
//!
//! Every stage turns into a transient artifact holding its struct
//! declarations, its action text and its control-flow fragment. Filter,
//! project and zip stages wrap their code fragment in a single action; a
//! group-by stage additionally gets key/value struct types and an aggregation
//! action block rendered from the group-by template.
//!
//! All identifiers derive from the stage name with fixed prefixes, so the
//! generated program is collision-free exactly when stage names are unique,
//! which the schema parser enforces.

use std::collections::HashMap;

use crate::fields::{FieldLookupError, FieldSourceMap};
use crate::render::{RenderError, Template};
use crate::schema::{OpKind, Schema, Stage};

/// Built-in pipeline template, overridable at process start.
pub const PIPELINE_TEMPLATE: &str = include_str!("templates/pipeline.p4.tmpl");

/// Built-in group-by actions template, overridable at process start.
pub const GROUPBY_TEMPLATE: &str = include_str!("templates/groupby_actions.tmpl");

/// Struct field width in the fixed-width mode, in bits.
pub const FIELD_WIDTH: u32 = 32;

/// Default backing-store row count.
pub const DEFAULT_TABLE_SIZE: u32 = 1024;

/// Slot names of one backing-store row, most recently used first.
const ROW_SLOTS: [&str; 4] = ["first", "second", "third", "fourth"];

const TARGET: &str = "v1model";
const PIPELINE_TEMPLATE_NAME: &str = "pipeline.p4.tmpl";

/// Backing-store layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// Canonical mode: every struct field is `bit<32>` and rows have four
    /// slots; only the row count varies.
    Fixed,
    /// Superseded mode with explicit widths and associativity. Kept for old
    /// call sites and custom templates; the built-in template assumes the
    /// fixed layout.
    Explicit {
        key_width: u32,
        value_width: u32,
        ways: u8,
    },
}

impl Geometry {
    pub fn key_width(&self) -> u32 {
        match self {
            Geometry::Fixed => FIELD_WIDTH,
            Geometry::Explicit { key_width, .. } => *key_width,
        }
    }

    pub fn value_width(&self) -> u32 {
        match self {
            Geometry::Fixed => FIELD_WIDTH,
            Geometry::Explicit { value_width, .. } => *value_width,
        }
    }

    pub fn ways(&self) -> u8 {
        match self {
            Geometry::Fixed => ROW_SLOTS.len() as u8,
            Geometry::Explicit { ways, .. } => *ways,
        }
    }
}

/// Run configuration for the generator.
#[derive(Debug, Clone)]
pub struct GenConfig {
    /// Row count of every group-by backing store.
    pub table_size: u32,
    pub geometry: Geometry,
}

impl Default for GenConfig {
    fn default() -> Self {
        GenConfig {
            table_size: DEFAULT_TABLE_SIZE,
            geometry: Geometry::Fixed,
        }
    }
}

/// Errors raised while generating stage artifacts.
#[derive(Debug)]
pub enum GenError {
    /// Stage whose operation keyword the parser did not recognize
    UnsupportedStage(String),
    /// Grouping key field with no physical source
    FieldLookup(FieldLookupError),
    /// Group-by template failure
    Render(RenderError),
}

impl std::fmt::Display for GenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenError::UnsupportedStage(stage) => {
                write!(f, "unsupported operation in stage '{}'", stage)
            }
            GenError::FieldLookup(e) => write!(f, "{}", e),
            GenError::Render(e) => write!(f, "group-by template: {}", e),
        }
    }
}

impl std::error::Error for GenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenError::FieldLookup(e) => Some(e),
            GenError::Render(e) => Some(e),
            GenError::UnsupportedStage(_) => None,
        }
    }
}

impl From<FieldLookupError> for GenError {
    fn from(e: FieldLookupError) -> Self {
        GenError::FieldLookup(e)
    }
}

impl From<RenderError> for GenError {
    fn from(e: RenderError) -> Self {
        GenError::Render(e)
    }
}

/// Generated text for one stage. Discarded once the document is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct StageArtifact {
    /// Top-level type declarations, in emit order.
    pub structs: Vec<String>,
    /// Action block placed inside the ingress control.
    pub actions: String,
    /// Invocation fragment placed inside the apply block.
    pub control: String,
}

/// The render-ready document handed to the template engine exactly once.
#[derive(Debug, Clone)]
pub struct Document {
    pub template_name: String,
    pub target: String,
    pub common_meta: Vec<String>,
    pub query_meta: Vec<String>,
    /// Per-stage artifacts, in input order.
    pub stages: Vec<StageArtifact>,
}

impl Document {
    /// Flattens the document into the pipeline template's substitution
    /// context. Stage order is preserved in every section.
    pub fn render_context(&self) -> HashMap<String, String> {
        let mut structs = Vec::new();
        let mut actions = Vec::new();
        let mut control = Vec::new();
        for stage in &self.stages {
            structs.extend(stage.structs.iter().cloned());
            actions.push(stage.actions.clone());
            control.push(stage.control.clone());
        }

        let mut context = HashMap::new();
        context.insert("target".to_string(), self.target.clone());
        context.insert("common_meta".to_string(), indent_lines(&self.common_meta));
        context.insert("query_meta".to_string(), indent_lines(&self.query_meta));
        context.insert("structs".to_string(), structs.join("\n\n"));
        context.insert("actions".to_string(), actions.join("\n"));
        context.insert("control".to_string(), control.join("\n"));
        context
    }
}

/// Identifiers derived from a stage name. One fixed prefix per role keeps the
/// generated program free of collisions across stages.
struct StageNames {
    update_fn: String,
    equals_fn: String,
    zero_fn: String,
    groupby_fn: String,
    key_type: String,
    value_type: String,
    row_key_type: String,
    row_value_type: String,
    key_reg: String,
    value_reg: String,
    default_key: String,
    default_value: String,
    evicted_key: String,
    evicted_value: String,
}

impl StageNames {
    fn new(stage: &str) -> StageNames {
        StageNames {
            update_fn: format!("update_{}", stage),
            equals_fn: format!("equals_{}", stage),
            zero_fn: format!("isZero_{}", stage),
            groupby_fn: format!("groupby_{}", stage),
            key_type: format!("Key_{}", stage),
            value_type: format!("Value_{}", stage),
            row_key_type: format!("RowKey_{}", stage),
            row_value_type: format!("RowValue_{}", stage),
            key_reg: format!("KeyReg_{}", stage),
            value_reg: format!("ValueReg_{}", stage),
            default_key: format!("defaultKey_{}", stage),
            default_value: format!("defaultVal_{}", stage),
            evicted_key: format!("evictedKey_{}", stage),
            evicted_value: format!("evictedValue_{}", stage),
        }
    }
}

/// Prefixes every line after the first with `prefix`. The first line keeps
/// its position; the emitting site supplies its indentation.
fn indent_continuation(body: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(body.len());
    for (i, line) in body.lines().enumerate() {
        if i > 0 {
            out.push('\n');
            out.push_str(prefix);
        }
        out.push_str(line);
    }
    out
}

fn indent_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("\t{}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// All-zero tuple literal of the given arity, e.g. `{0,0}`.
fn zero_tuple(arity: usize) -> String {
    format!("{{{}}}", vec!["0"; arity].join(","))
}

fn struct_decl(name: &str, width: u32, fields: &[String]) -> String {
    let body = fields
        .iter()
        .map(|field| format!("\tbit<{}> {};", width, field))
        .collect::<Vec<_>>()
        .join("\n");
    format!("struct {} {{\n{}\n}}", name, body)
}

fn row_struct_decl(name: &str, entry_type: &str) -> String {
    let body = ROW_SLOTS
        .iter()
        .map(|slot| format!("\t{} {};", entry_type, slot))
        .collect::<Vec<_>>()
        .join("\n");
    format!("struct {} {{\n{}\n}}", name, body)
}

/// Produces stage artifacts for one run. Holds the configuration, a reference
/// to the field source table and the parsed group-by template.
pub struct Generator<'a> {
    config: GenConfig,
    fields: &'a FieldSourceMap,
    groupby: Template,
}

impl<'a> Generator<'a> {
    /// Creates a generator using the built-in group-by template.
    pub fn new(config: GenConfig, fields: &'a FieldSourceMap) -> Result<Generator<'a>, RenderError> {
        Generator::with_groupby_template(config, fields, GROUPBY_TEMPLATE)
    }

    /// Creates a generator with a caller-supplied group-by template source.
    pub fn with_groupby_template(
        config: GenConfig,
        fields: &'a FieldSourceMap,
        source: &str,
    ) -> Result<Generator<'a>, RenderError> {
        Ok(Generator {
            config,
            fields,
            groupby: Template::parse(source)?,
        })
    }

    /// Generates artifacts for every stage, in input order, and assembles the
    /// render-ready document.
    pub fn generate(&self, schema: &Schema) -> Result<Document, GenError> {
        let mut stages = Vec::with_capacity(schema.stages.len());
        for stage in &schema.stages {
            stages.push(self.stage_artifact(stage)?);
        }
        Ok(Document {
            template_name: PIPELINE_TEMPLATE_NAME.to_string(),
            target: TARGET.to_string(),
            common_meta: schema.common_meta.clone(),
            query_meta: schema.query_meta.clone(),
            stages,
        })
    }

    /// Generates the artifact for a single stage.
    pub fn stage_artifact(&self, stage: &Stage) -> Result<StageArtifact, GenError> {
        match stage.op {
            OpKind::Filter | OpKind::Project | OpKind::Zip => Ok(self.basic_artifact(stage)),
            OpKind::GroupBy => self.groupby_artifact(stage),
            OpKind::Unknown => Err(GenError::UnsupportedStage(stage.name.clone())),
        }
    }

    /// Filter, project and zip stages all reduce to one action wrapping the
    /// code fragment, invoked unconditionally.
    fn basic_artifact(&self, stage: &Stage) -> StageArtifact {
        let names = StageNames::new(&stage.name);
        let actions = format!(
            "\taction {}() {{\n\t\t{}\n\t}}\n",
            names.update_fn,
            indent_continuation(&stage.code, "\t\t")
        );
        let control = format!("\t\t{}();", names.update_fn);
        StageArtifact {
            structs: Vec::new(),
            actions,
            control,
        }
    }

    fn groupby_artifact(&self, stage: &Stage) -> Result<StageArtifact, GenError> {
        let names = StageNames::new(&stage.name);

        // Key sources must resolve before any text is produced for the stage.
        let mut sources = Vec::with_capacity(stage.key_fields.len());
        for field in &stage.key_fields {
            sources.push(self.fields.resolve(field, &stage.name)?);
        }

        let structs = vec![
            struct_decl(&names.key_type, self.config.geometry.key_width(), &stage.key_fields),
            struct_decl(&names.value_type, self.config.geometry.value_width(), &stage.registers),
            row_struct_decl(&names.row_key_type, &names.key_type),
            row_struct_decl(&names.row_value_type, &names.value_type),
        ];

        let key_fill = stage
            .key_fields
            .iter()
            .zip(&sources)
            .map(|(field, source)| format!("key.{} = {};", field, source))
            .collect::<Vec<_>>()
            .join("\n\t\t");
        let key_args = if stage.key_fields.is_empty() {
            "32w0".to_string()
        } else {
            stage
                .key_fields
                .iter()
                .map(|field| format!("key.{}", field))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let key_eq = if stage.key_fields.is_empty() {
            "true".to_string()
        } else {
            stage
                .key_fields
                .iter()
                .map(|field| format!("a.{} == b.{}", field, field))
                .collect::<Vec<_>>()
                .join(" && ")
        };
        let key_zero = if stage.key_fields.is_empty() {
            "true".to_string()
        } else {
            stage
                .key_fields
                .iter()
                .map(|field| format!("k.{} == 0", field))
                .collect::<Vec<_>>()
                .join(" && ")
        };

        let mut context = HashMap::new();
        let mut put = |key: &str, value: String| {
            context.insert(key.to_string(), value);
        };
        put("update_fn", names.update_fn.clone());
        put("equals_fn", names.equals_fn.clone());
        put("zero_fn", names.zero_fn.clone());
        put("groupby_fn", names.groupby_fn.clone());
        put("key_type", names.key_type.clone());
        put("value_type", names.value_type.clone());
        put("row_key_type", names.row_key_type.clone());
        put("row_value_type", names.row_value_type.clone());
        put("key_reg", names.key_reg.clone());
        put("value_reg", names.value_reg.clone());
        put("table_size", self.config.table_size.to_string());
        put("ways", self.config.geometry.ways().to_string());
        put("key_fields", stage.key_fields.join(", "));
        put("registers", stage.registers.join(", "));
        put("update_code", indent_continuation(&stage.code, "\t\t"));
        put("default_key_name", names.default_key.clone());
        put("default_key", zero_tuple(stage.key_fields.len()));
        put("default_value_name", names.default_value.clone());
        put("default_value", zero_tuple(stage.registers.len()));
        put("key_fill", key_fill);
        put("key_args", key_args);
        put("key_eq", key_eq);
        put("key_zero", key_zero);

        let actions = self.groupby.render(&context)?;
        let control = format!(
            "\t\t{} {};\n\t\t{} {};\n\t\t{}({}, {});",
            names.key_type,
            names.evicted_key,
            names.value_type,
            names.evicted_value,
            names.groupby_fn,
            names.evicted_key,
            names.evicted_value
        );

        Ok(StageArtifact {
            structs,
            actions,
            control,
        })
    }
}
