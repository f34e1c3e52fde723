//! Parsing of `url` / `url_sep` field tags into [`FieldDirective`]s.
//!
//! Grammar of the primary tag:
//!
//! | tag | directive |
//! |-----|-----------|
//! | absent | no-op, field excluded |
//! | `-` | always omitted |
//! | `<key>` | encoded under `key` |
//! | `<key>,omitempty` | encoded under `key`, skipped when empty |
//!
//! The separator tag is kept verbatim and only matters for sequence values.

use std::sync::OnceLock;

use crate::encode::FieldDef;
use crate::{Error, Result};

/// Parsed intent of a field's tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDirective {
    /// Query key; `None` when the field carries no primary tag.
    pub key: Option<String>,
    /// The field never appears in the output.
    pub omit_always: bool,
    /// The field is skipped when zero or when it converts to nothing.
    pub omit_empty: bool,
    /// Joins sequence values into a single string.
    pub separator: Option<String>,
}

impl FieldDirective {
    /// Whether the field contributes nothing, whatever its value.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.omit_always || self.key.is_none()
    }
}

/// Parse a field's primary tag and separator tag.
///
/// # Errors
///
/// Returns [`Error::BadTagSyntax`] when the key is empty, when the second component is not
/// `omitempty`, or when there are more than two components.
///
/// # Example
///
/// ```
/// use hitch_core::parse_directive;
///
/// let directive = parse_directive(Some("tags,omitempty"), Some(",")).unwrap();
/// assert_eq!(directive.key.as_deref(), Some("tags"));
/// assert!(directive.omit_empty);
/// assert_eq!(directive.separator.as_deref(), Some(","));
/// ```
pub fn parse_directive(tag: Option<&str>, separator: Option<&str>) -> Result<FieldDirective> {
    let mut directive = FieldDirective {
        separator: separator.map(str::to_owned),
        ..FieldDirective::default()
    };

    let Some(tag) = tag else {
        return Ok(directive);
    };

    if tag == "-" {
        directive.omit_always = true;
        return Ok(directive);
    }

    let mut parts = tag.split(',');
    let key = parts.next().unwrap_or_default();
    match (parts.next(), parts.next()) {
        (None, _) => {}
        (Some("omitempty"), None) => directive.omit_empty = true,
        (Some(_), None) => {
            return Err(Error::bad_tag(tag, "second field can only be 'omitempty'"));
        }
        (Some(_), Some(_)) => return Err(Error::bad_tag(tag, "too many fields")),
    }

    if key.is_empty() {
        return Err(Error::bad_tag(tag, "key must not be empty"));
    }

    directive.key = Some(key.to_owned());
    Ok(directive)
}

/// Parsed directives of one type, in field declaration order.
pub type Directives = [Result<FieldDirective>];

/// Per-type memo of parsed directives.
///
/// `#[derive(Query)]` emits one of these as a `static` so tags are parsed once per type.
/// Parse failures are memoized too and reported on every encode.
#[derive(Debug)]
pub struct DirectiveCache {
    parsed: OnceLock<Vec<Result<FieldDirective>>>,
}

impl DirectiveCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            parsed: OnceLock::new(),
        }
    }

    /// Directives for `fields`, parsed on first use.
    pub fn get_or_parse(&self, fields: &[FieldDef]) -> &Directives {
        self.parsed.get_or_init(|| {
            tracing::trace!(fields = fields.len(), "parsing url tags");
            fields
                .iter()
                .map(|field| parse_directive(field.tag, field.separator))
                .collect()
        })
    }
}

impl Default for DirectiveCache {
    fn default() -> Self {
        Self::new()
    }
}
