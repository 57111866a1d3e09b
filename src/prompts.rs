//! Prompt template library
//!
//! Templates are markdown documents embedded at compile time, each with a
//! `## System Prompt` and a `## User Prompt Template` section. The library is
//! constructed by the caller and passed to whoever needs it; parsed templates
//! are cached after first use.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Template for generating example phrases
pub const PHRASE_GENERATION: &str = "phrase-generation";
/// Template for explanations in a different language than the studied one
pub const EXPLANATION_BILINGUAL: &str = "explanation-generation-bilingual";
/// Template for explanations in the studied language itself
pub const EXPLANATION_MONOLINGUAL: &str = "explanation-generation-monolingual";

/// Embedded template files (compiled into binary)
const TEMPLATE_SOURCES: &[(&str, &str)] = &[
    (
        PHRASE_GENERATION,
        include_str!("../prompts/phrase-generation.md"),
    ),
    (
        EXPLANATION_BILINGUAL,
        include_str!("../prompts/explanation-generation-bilingual.md"),
    ),
    (
        EXPLANATION_MONOLINGUAL,
        include_str!("../prompts/explanation-generation-monolingual.md"),
    ),
];

/// A parsed prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

/// A template with its variables substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Loads, parses, and caches prompt templates
pub struct PromptLibrary {
    cache: Mutex<HashMap<String, Arc<PromptTemplate>>>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Get a parsed template by name
    pub fn template(&self, name: &str) -> Result<Arc<PromptTemplate>> {
        if let Some(template) = self.cache.lock().get(name) {
            return Ok(template.clone());
        }

        let source = TEMPLATE_SOURCES
            .iter()
            .find(|(template_name, _)| *template_name == name)
            .map(|(_, source)| *source)
            .ok_or_else(|| Error::Template(format!("Unknown prompt template: {name}")))?;

        let template = Arc::new(parse_template(name, source)?);
        self.cache
            .lock()
            .insert(name.to_string(), template.clone());
        Ok(template)
    }

    /// Get a template with `{{key}}` placeholders substituted
    pub fn rendered(&self, name: &str, variables: &[(&str, &str)]) -> Result<RenderedPrompt> {
        let template = self.template(name)?;
        Ok(RenderedPrompt {
            system: render(&template.system, variables),
            user: render(&template.user, variables),
        })
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_template(name: &str, source: &str) -> Result<PromptTemplate> {
    let system = extract_section(source, "System Prompt")
        .ok_or_else(|| Error::Template(format!("{name}: missing '## System Prompt' section")))?;
    let user = extract_section(source, "User Prompt Template").ok_or_else(|| {
        Error::Template(format!("{name}: missing '## User Prompt Template' section"))
    })?;
    Ok(PromptTemplate { system, user })
}

/// Pull the body of one `## heading` section, up to the next `## ` or EOF
fn extract_section(content: &str, heading: &str) -> Option<String> {
    let marker = format!("## {heading}\n");
    let start = content.find(&marker)? + marker.len();
    let rest = &content[start..];
    let end = rest.find("\n## ").unwrap_or(rest.len());
    let body = rest[..end].trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (key, value) in variables {
        rendered = rendered.replace(&format!("{{{{{key}}}}}"), value);
    }
    rendered
}
