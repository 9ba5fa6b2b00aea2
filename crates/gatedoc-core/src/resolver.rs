//! Rewrites internal schema pointers into inert model placeholders.
//!
//! A pointer such as `#/components/schemas/Widget` becomes `{{model: Widget}}`.
//! Placeholders are later turned into API Gateway model URLs by the template
//! synthesizer, so the same schema is never embedded twice.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

/// Key holding an internal pointer inside a schema object
pub const REF_KEY: &str = "$ref";

static DEFINITIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#/definitions/([\w-]+)$").expect("valid definitions pattern"));

static COMPONENT_SCHEMAS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#/components/schemas/([\w-]+)$").expect("valid component schema pattern")
});

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{model:\s*([\w-]+)\}\}$").expect("valid placeholder pattern"));

/// Shape of the internal schema pointers understood by a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPattern {
    /// `#/definitions/<name>`
    Definitions,
    /// `#/components/schemas/<name>`
    ComponentSchemas,
}

impl PointerPattern {
    fn regex(self) -> &'static Regex {
        match self {
            Self::Definitions => &DEFINITIONS_RE,
            Self::ComponentSchemas => &COMPONENT_SCHEMAS_RE,
        }
    }

    /// Returns the schema name a pointer refers to, if it matches this pattern.
    pub fn parse<'a>(self, pointer: &'a str) -> Option<&'a str> {
        self.regex()
            .captures(pointer)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Format the placeholder substituted for a resolved pointer.
pub fn placeholder(name: &str) -> String {
    format!("{{{{model: {name}}}}}")
}

/// Returns the model name captured by a placeholder string.
pub fn parse_placeholder(value: &str) -> Option<&str> {
    PLACEHOLDER_RE
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Replace every matching `$ref` under `tree` with a placeholder, in place.
///
/// Non-matching pointers and scalar leaves are left untouched. Recursion is
/// bounded by the structural depth of the tree.
pub fn resolve(tree: &mut JsonValue, pattern: PointerPattern) {
    match tree {
        JsonValue::Object(map) => {
            for (key, value) in map.iter_mut() {
                if key == REF_KEY {
                    if let JsonValue::String(pointer) = value {
                        if let Some(name) = pattern.parse(pointer) {
                            *pointer = placeholder(name);
                        }
                    }
                    continue;
                }
                resolve(value, pattern);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                resolve(item, pattern);
            }
        }
        _ => {}
    }
}
