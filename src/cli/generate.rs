//! Run the full generation pipeline on one schema document

use super::CliError;
use crate::codegen::{GenConfig, Generator, Geometry, PIPELINE_TEMPLATE};
use crate::fields::FieldSourceMap;
use crate::render::Template;
use crate::schema::Schema;

/// Options for the generate command
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Lowered schema text produced by the upstream query compiler
    pub schema: String,
    /// Row count of every group-by backing store
    pub table_size: u32,
    /// Backing-store layout; `Fixed` unless the superseded width flags are used
    pub geometry: Geometry,
    /// Pipeline template source overriding the built-in one
    pub template: Option<String>,
    /// Group-by actions template source overriding the built-in one
    pub groupby_template: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            schema: String::new(),
            table_size: crate::codegen::DEFAULT_TABLE_SIZE,
            geometry: Geometry::Fixed,
            template: None,
            groupby_template: None,
        }
    }
}

/// Executes one generation run: parse, resolve fields, generate every stage
/// in input order, render once. Any failure aborts with nothing emitted.
pub fn execute_generate(options: &GenerateOptions) -> Result<String, CliError> {
    let schema = Schema::parse(&options.schema)?;
    let fields = FieldSourceMap::build(&schema);

    let config = GenConfig {
        table_size: options.table_size,
        geometry: options.geometry,
    };
    let generator = match &options.groupby_template {
        Some(source) => Generator::with_groupby_template(config, &fields, source),
        None => Generator::new(config, &fields),
    }?;

    let document = generator.generate(&schema)?;

    let template_source = options.template.as_deref().unwrap_or(PIPELINE_TEMPLATE);
    let template = Template::parse(template_source)?;
    Ok(template.render(&document.render_context())?)
}
