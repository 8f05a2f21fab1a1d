//! Minimal text-substitution templates.
//!
//! A template source holds exactly one named definition:
//!
//! ```text
//! {{define "pipeline"}}
//! control {{name}} { ... }
//! {{end}}
//! ```
//!
//! Rendering replaces each `{{key}}` placeholder with the value supplied for
//! `key` and leaves every other byte untouched. There is no logic layer: no
//! conditionals, no loops, no recursive expansion of substituted values. The
//! caller precomputes whatever the output needs and the template decides only
//! where it lands.

use std::collections::HashMap;

use regex::Regex;

/// Errors raised while parsing or rendering a template.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The source contains no definition block
    NoDefinition,
    /// The source contains more than one definition block
    MultipleDefinitions(usize),
    /// A definition block without a closing marker
    Unterminated(String),
    /// A placeholder with no entry in the substitution context
    UnknownKey(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::NoDefinition => {
                write!(f, "template source defines no template")
            }
            RenderError::MultipleDefinitions(count) => {
                write!(f, "template source defines {} templates, expected exactly 1", count)
            }
            RenderError::Unterminated(name) => {
                write!(f, "template '{}' has no closing {{{{end}}}} marker", name)
            }
            RenderError::UnknownKey(key) => {
                write!(f, "no substitution for template placeholder '{}'", key)
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// A parsed template definition.
pub struct Template {
    name: String,
    body: String,
    placeholder: Regex,
}

impl Template {
    /// Parses a template source, requiring exactly one definition block.
    pub fn parse(source: &str) -> Result<Template, RenderError> {
        let define = Regex::new(r#"\{\{define\s+"([^"]+)"\}\}"#).expect("define pattern");
        let heads: Vec<(usize, String)> = define
            .captures_iter(source)
            .filter_map(|cap| cap.get(0).map(|whole| (whole.end(), cap[1].to_string())))
            .collect();
        if heads.len() > 1 {
            return Err(RenderError::MultipleDefinitions(heads.len()));
        }
        let (body_start, name) = match heads.into_iter().next() {
            Some(head) => head,
            None => return Err(RenderError::NoDefinition),
        };

        let rest = &source[body_start..];
        let body_end = rest
            .find("{{end}}")
            .ok_or_else(|| RenderError::Unterminated(name.clone()))?;
        let body = rest[..body_end].strip_prefix('\n').unwrap_or(&rest[..body_end]);

        Ok(Template {
            name,
            body: body.to_string(),
            placeholder: Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
                .expect("placeholder pattern"),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitutes every placeholder from `context`. Substituted values are
    /// emitted verbatim and never rescanned.
    pub fn render(&self, context: &HashMap<String, String>) -> Result<String, RenderError> {
        let mut out = String::with_capacity(self.body.len());
        let mut last = 0;
        for cap in self.placeholder.captures_iter(&self.body) {
            let whole = match cap.get(0) {
                Some(m) => m,
                None => continue,
            };
            let key = &cap[1];
            out.push_str(&self.body[last..whole.start()]);
            match context.get(key) {
                Some(value) => out.push_str(value),
                None => return Err(RenderError::UnknownKey(key.to_string())),
            }
            last = whole.end();
        }
        out.push_str(&self.body[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_single_definition_renders() {
        let tmpl = Template::parse("{{define \"t\"}}\nhello {{who}}\n{{end}}\n").unwrap();
        assert_eq!(tmpl.name(), "t");
        let out = tmpl.render(&context(&[("who", "world")])).unwrap();
        assert_eq!(out, "hello world\n");
    }

    #[test]
    fn test_no_definition() {
        let err = Template::parse("just text").map(|_| ()).unwrap_err();
        assert_eq!(err, RenderError::NoDefinition);
    }
}
