//! Template rendering.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use stevedore_spec::ConfigFile;

use crate::context::TemplateContext;
use crate::error::{TemplateError, TemplateResult};
use crate::loader::TemplateSet;

/// Strict placeholder renderer.
///
/// Every `{{ ... }}` span must hold a single defined name. Filters,
/// expressions and unknown names fail the render instead of being left in
/// the output.
pub struct TemplateRenderer {
    placeholder_pattern: Regex,
    name_pattern: Regex,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> Self {
        Self {
            // Any {{ ... }} span, possibly across lines
            placeholder_pattern: Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap(),
            // {{variable_name}} or {{ env.KEY }}
            name_pattern: Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_.\-]*$").unwrap(),
        }
    }

    /// Render one template source.
    pub fn render(
        &self,
        template: &str,
        source: &str,
        context: &TemplateContext,
    ) -> TemplateResult<String> {
        let mut rendered = String::with_capacity(source.len());
        let mut last = 0;

        for caps in self.placeholder_pattern.captures_iter(source) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = self.placeholder_name(template, whole.as_str(), inner.as_str())?;
            let value = context
                .get(name)
                .ok_or_else(|| TemplateError::UndefinedVariable {
                    template: template.to_string(),
                    variable: name.to_string(),
                })?;

            rendered.push_str(&source[last..whole.start()]);
            rendered.push_str(value);
            last = whole.end();
        }

        let tail = &source[last..];
        if let Some(open) = tail.find("{{") {
            return Err(TemplateError::InvalidPlaceholder {
                template: template.to_string(),
                placeholder: tail[open..].lines().next().unwrap_or_default().to_string(),
            });
        }
        rendered.push_str(tail);

        Ok(rendered)
    }

    fn placeholder_name<'a>(
        &self,
        template: &str,
        whole: &str,
        inner: &'a str,
    ) -> TemplateResult<&'a str> {
        let name = inner.trim();
        if self.name_pattern.is_match(name) {
            Ok(name)
        } else {
            Err(TemplateError::InvalidPlaceholder {
                template: template.to_string(),
                placeholder: whole.to_string(),
            })
        }
    }

    /// Render every bound config file, keyed by destination file name.
    pub fn render_files(
        &self,
        templates: &TemplateSet,
        files: &[ConfigFile],
        context: &TemplateContext,
    ) -> TemplateResult<BTreeMap<String, String>> {
        let mut output = BTreeMap::new();
        for file in files {
            let source = templates
                .get(&file.name)
                .ok_or_else(|| TemplateError::NotLoaded(file.name.clone()))?;
            let rendered = self.render(&file.name, source, context)?;
            debug!("Rendered {} -> {} ({} bytes)", file.name, file.dest, rendered.len());
            output.insert(file.dest.clone(), rendered);
        }
        Ok(output)
    }

    /// Placeholder names referenced by a template, in order of appearance.
    ///
    /// Spans that are not a bare name are skipped.
    pub fn variables<'a>(&self, source: &'a str) -> Vec<&'a str> {
        self.placeholder_pattern
            .captures_iter(source)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim()))
            .filter(|name| self.name_pattern.is_match(name))
            .collect()
    }
}
