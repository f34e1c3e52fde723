//! Tag-driven query encoding of structs.
//!
//! A [`Query`] type publishes a static field table ([`Query::FIELDS`]) and an accessor
//! ([`Query::field`]); `#[derive(Query)]` generates both. [`encode`] walks the table in
//! declaration order:
//!
//! 1. fields that are not `pub` are skipped
//! 2. embedded structs are encoded recursively and spliced in
//! 3. the field's directive is looked up (parsed once per type); omitted fields are skipped
//! 4. an `Option` is dereferenced once, `None` standing for the pointee's zero value
//! 5. `omitempty` fields holding a zero value are skipped; a struct is zero when all of its
//!    inspectable fields are
//! 6. the value is coerced, failures naming the field's key
//! 7. `omitempty` fields drop empty strings, and are skipped if nothing remains
//! 8. the strings are appended under the key

use crate::coerce::{QueryValue, Value, stringify};
use crate::directive::{Directives, FieldDirective};
use crate::{EncodedValues, Error, Result};

/// Static description of one struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Declaration name.
    pub name: &'static str,
    /// Whether the field is `pub`.
    pub visible: bool,
    /// Whether the field is an embedded struct.
    pub embedded: bool,
    /// Primary tag text (`#[url("...")]`).
    pub tag: Option<&'static str>,
    /// Separator tag text (`#[url_sep("...")]`).
    pub separator: Option<&'static str>,
}

impl FieldDef {
    /// A visible, untagged field.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            visible: true,
            embedded: false,
            tag: None,
            separator: None,
        }
    }

    /// Sets the primary tag.
    #[must_use]
    pub const fn tag(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Sets the separator tag.
    #[must_use]
    pub const fn separator(mut self, separator: &'static str) -> Self {
        self.separator = Some(separator);
        self
    }

    /// Marks the field as not externally visible.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Marks the field as an embedded struct.
    #[must_use]
    pub const fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }
}

/// Runtime access to one field's value.
pub enum Field<'a> {
    /// A value to coerce.
    Value(&'a dyn QueryValue),
    /// An embedded struct to splice.
    Embedded(&'a dyn EncodeInto),
    /// Not inspectable (untagged or private).
    Opaque,
}

/// A struct with a field-descriptor table.
///
/// Usually derived:
///
/// ```ignore
/// use hitch::Query;
///
/// #[derive(Query)]
/// pub struct Search {
///     #[url("q")]
///     pub text: String,
///     #[url("tags")]
///     #[url_sep(",")]
///     pub tags: Vec<String>,
///     #[url("page,omitempty")]
///     pub page: Option<u32>,
///     #[url(embed)]
///     pub paging: Paging,
/// }
/// ```
pub trait Query {
    /// Fields in declaration order.
    const FIELDS: &'static [FieldDef];

    /// Value of the field at `index` in [`FIELDS`](Self::FIELDS).
    fn field(&self, index: usize) -> Field<'_>;

    /// Parsed directives, one per entry of [`FIELDS`](Self::FIELDS).
    fn directives() -> &'static Directives;
}

/// Object-safe side of [`Query`], used for embedded structs.
pub trait EncodeInto {
    /// Append this struct's encoding to `out`.
    fn encode_into(&self, out: &mut EncodedValues) -> Result<()>;

    /// Short rendering for diagnostics.
    fn preview(&self) -> String;

    /// Whether every inspectable field holds its zero value.
    fn fields_are_zero(&self) -> bool;
}

impl<T: Query> EncodeInto for T {
    fn encode_into(&self, out: &mut EncodedValues) -> Result<()> {
        encode_fields(self, out)
    }

    fn preview(&self) -> String {
        let mut values = EncodedValues::new();
        match encode_fields(self, &mut values) {
            Ok(()) => format!("{{{values}}}"),
            Err(_) => "{..}".to_string(),
        }
    }

    fn fields_are_zero(&self) -> bool {
        T::FIELDS
            .iter()
            .enumerate()
            .filter(|(_, def)| def.visible)
            .all(|(index, _)| match self.field(index) {
                Field::Value(field) => field.is_zero(),
                Field::Embedded(embedded) => embedded.fields_are_zero(),
                Field::Opaque => true,
            })
    }
}

/// Encode a struct into ordered query values.
///
/// # Errors
///
/// Returns [`Error::BadTagSyntax`] for a malformed tag, [`Error::Field`] when a field value
/// cannot be coerced, and [`Error::Embedded`] when an embedded struct fails.
pub fn encode<T: Query>(value: &T) -> Result<EncodedValues> {
    let mut out = EncodedValues::new();
    encode_fields(value, &mut out)?;
    Ok(out)
}

/// Encode an arbitrary value, which must be a struct once dereferenced.
///
/// # Errors
///
/// Returns [`Error::NotAStruct`] when the value is not a [`Query`] struct, plus every error of
/// [`encode`].
pub fn encode_value(value: &dyn QueryValue) -> Result<EncodedValues> {
    let outer = value.value();
    let inner;
    let kind = match &outer {
        Value::Indirect(pointee) => {
            inner = pointee.get().value();
            &inner
        }
        other => other,
    };

    let Value::Struct(encodable) = kind else {
        return Err(Error::NotAStruct {
            type_name: value.type_name(),
        });
    };

    let mut out = EncodedValues::new();
    encodable.encode_into(&mut out)?;
    Ok(out)
}

fn encode_fields<T: Query>(value: &T, out: &mut EncodedValues) -> Result<()> {
    let directives = T::directives();

    for (index, def) in T::FIELDS.iter().enumerate() {
        if !def.visible {
            continue;
        }

        match value.field(index) {
            Field::Opaque => {}
            Field::Embedded(embedded) => {
                let mut nested = EncodedValues::new();
                embedded
                    .encode_into(&mut nested)
                    .map_err(|source| Error::Embedded {
                        field: def.name,
                        source: Box::new(source),
                    })?;
                out.extend(nested);
            }
            Field::Value(field) => {
                let directive = match directives.get(index) {
                    Some(Ok(directive)) => directive,
                    Some(Err(err)) => return Err(replay(err)),
                    None => continue,
                };
                encode_field(field, directive, out)?;
            }
        }
    }

    Ok(())
}

fn encode_field(
    field: &dyn QueryValue,
    directive: &FieldDirective,
    out: &mut EncodedValues,
) -> Result<()> {
    if directive.omit_always {
        return Ok(());
    }
    let Some(key) = directive.key.as_deref() else {
        return Ok(());
    };

    let kind = field.value();
    let target = match &kind {
        Value::Indirect(pointee) => pointee.get(),
        _ => field,
    };

    if directive.omit_empty && target.is_zero() {
        return Ok(());
    }

    let mut strings =
        stringify(target, directive.separator.as_deref()).map_err(|source| Error::Field {
            key: key.to_owned(),
            source: Box::new(source),
        })?;

    if directive.omit_empty {
        strings.retain(|s| !s.is_empty());
    }

    for s in strings {
        out.add(key, s);
    }
    Ok(())
}

/// Memoized parse failures are re-raised as fresh errors.
fn replay(err: &Error) -> Error {
    match err {
        Error::BadTagSyntax { tag, reason } => Error::bad_tag(tag.clone(), reason),
        other => Error::invalid_request(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::DirectiveCache;

    #[derive(Default)]
    struct Paging {
        page: u32,
        per_page: Option<u32>,
    }

    impl Query for Paging {
        const FIELDS: &'static [FieldDef] = &[
            FieldDef::new("page").tag("page"),
            FieldDef::new("per_page").tag("per_page,omitempty"),
        ];

        fn field(&self, index: usize) -> Field<'_> {
            match index {
                0 => Field::Value(&self.page),
                1 => Field::Value(&self.per_page),
                _ => Field::Opaque,
            }
        }

        fn directives() -> &'static Directives {
            static CACHE: DirectiveCache = DirectiveCache::new();
            CACHE.get_or_parse(Self::FIELDS)
        }
    }

    impl QueryValue for Paging {
        fn value(&self) -> Value<'_> {
            Value::Struct(self)
        }
    }

    struct Search {
        text: String,
        tags: Vec<&'static str>,
        secret: String,
        sort: Option<String>,
        internal: u8,
        paging: Paging,
        hidden_paging: Paging,
        untagged: f64,
    }

    impl Query for Search {
        const FIELDS: &'static [FieldDef] = &[
            FieldDef::new("text").tag("q"),
            FieldDef::new("tags").tag("tag").separator(","),
            FieldDef::new("secret").tag("-"),
            FieldDef::new("sort").tag("sort,omitempty"),
            FieldDef::new("internal").tag("internal").hidden(),
            FieldDef::new("paging").embedded(),
            FieldDef::new("hidden_paging").embedded().hidden(),
            FieldDef::new("untagged"),
        ];

        fn field(&self, index: usize) -> Field<'_> {
            match index {
                0 => Field::Value(&self.text),
                1 => Field::Value(&self.tags),
                2 => Field::Value(&self.secret),
                3 => Field::Value(&self.sort),
                5 => Field::Embedded(&self.paging),
                6 => Field::Embedded(&self.hidden_paging),
                7 => Field::Value(&self.untagged),
                _ => Field::Opaque,
            }
        }

        fn directives() -> &'static Directives {
            static CACHE: DirectiveCache = DirectiveCache::new();
            CACHE.get_or_parse(Self::FIELDS)
        }
    }

    impl QueryValue for Search {
        fn value(&self) -> Value<'_> {
            Value::Struct(self)
        }
    }

    fn search() -> Search {
        Search {
            text: "rust".to_string(),
            tags: vec!["http", "query"],
            secret: "hunter2".to_string(),
            sort: None,
            internal: 9,
            paging: Paging {
                page: 2,
                per_page: None,
            },
            hidden_paging: Paging {
                page: 99,
                per_page: Some(99),
            },
            untagged: 1.5,
        }
    }

    #[test]
    fn encodes_in_declaration_order() {
        let values = encode(&search()).expect("encode");
        check!(values.keys().collect::<Vec<_>>() == vec!["q", "tag", "page"]);
        check!(values.get_all("tag") == ["http,query"]);
        check!(values.get("page") == Some("2"));
        insta::assert_snapshot!(values.to_query_string(), @"q=rust&tag=http%2Cquery&page=2");
    }

    #[test]
    fn omitempty_uses_dereferenced_value() {
        let mut value = search();
        value.sort = Some(String::new());
        check!(!encode(&value).expect("encode").contains_key("sort"));

        value.sort = Some("desc".to_string());
        check!(encode(&value).expect("encode").get("sort") == Some("desc"));

        value.paging.per_page = Some(0);
        check!(!encode(&value).expect("encode").contains_key("per_page"));
    }

    #[test]
    fn none_without_omitempty_encodes_zero_value() {
        struct Nullable {
            limit: Option<u32>,
        }

        impl Query for Nullable {
            const FIELDS: &'static [FieldDef] = &[FieldDef::new("limit").tag("limit")];

            fn field(&self, _index: usize) -> Field<'_> {
                Field::Value(&self.limit)
            }

            fn directives() -> &'static Directives {
                static CACHE: DirectiveCache = DirectiveCache::new();
                CACHE.get_or_parse(Self::FIELDS)
            }
        }

        let values = encode(&Nullable { limit: None }).expect("encode");
        check!(values.get_all("limit") == ["0"]);
    }

    #[test]
    fn encoding_is_idempotent() {
        let value = search();
        let first = encode(&value).expect("encode");
        let second = encode(&value).expect("encode");
        check!(first == second);
        check!(first.to_query_string() == second.to_query_string());
    }

    #[test]
    fn conversion_failure_names_key() {
        struct WithMap {
            filters: std::collections::BTreeMap<&'static str, u8>,
        }

        impl Query for WithMap {
            const FIELDS: &'static [FieldDef] = &[FieldDef::new("filters").tag("filter")];

            fn field(&self, _index: usize) -> Field<'_> {
                Field::Value(&self.filters)
            }

            fn directives() -> &'static Directives {
                static CACHE: DirectiveCache = DirectiveCache::new();
                CACHE.get_or_parse(Self::FIELDS)
            }
        }

        let value = WithMap {
            filters: [("a", 1)].into_iter().collect(),
        };
        let_assert!(Err(Error::Field { key, source }) = encode(&value));
        check!(key == "filter");
        check!(matches!(*source, Error::NotConvertible { .. }));
    }

    #[test]
    fn bad_tag_fails_every_time() {
        struct BadTag {
            a: u8,
        }

        impl Query for BadTag {
            const FIELDS: &'static [FieldDef] = &[FieldDef::new("a").tag("a,sometimes")];

            fn field(&self, _index: usize) -> Field<'_> {
                Field::Value(&self.a)
            }

            fn directives() -> &'static Directives {
                static CACHE: DirectiveCache = DirectiveCache::new();
                CACHE.get_or_parse(Self::FIELDS)
            }
        }

        for _ in 0..2 {
            let_assert!(Err(Error::BadTagSyntax { tag, .. }) = encode(&BadTag { a: 1 }));
            check!(tag == "a,sometimes");
        }
    }

    #[test]
    fn encode_value_requires_struct() {
        let_assert!(Err(Error::NotAStruct { type_name }) = encode_value(&42_u8));
        check!(type_name == "u8");

        let values = encode_value(&search()).expect("struct");
        check!(values.get("q") == Some("rust"));

        let values = encode_value(&Some(Paging::default())).expect("pointer to struct");
        check!(values.get("page") == Some("0"));
    }

    #[test]
    fn struct_field_is_not_convertible() {
        struct Outer {
            inner: Paging,
        }

        impl Query for Outer {
            const FIELDS: &'static [FieldDef] = &[FieldDef::new("inner").tag("inner")];

            fn field(&self, _index: usize) -> Field<'_> {
                Field::Value(&self.inner)
            }

            fn directives() -> &'static Directives {
                static CACHE: DirectiveCache = DirectiveCache::new();
                CACHE.get_or_parse(Self::FIELDS)
            }
        }

        let value = Outer {
            inner: Paging {
                page: 3,
                per_page: None,
            },
        };
        let_assert!(Err(err) = encode(&value));
        let_assert!(Error::NotConvertible { preview, .. } = err.root_cause());
        check!(preview == "{page=3}");
    }

    #[test]
    fn omitempty_skips_zero_structs() {
        struct Wrapper {
            paging: Option<Paging>,
        }

        impl Query for Wrapper {
            const FIELDS: &'static [FieldDef] = &[FieldDef::new("paging").tag("paging,omitempty")];

            fn field(&self, _index: usize) -> Field<'_> {
                Field::Value(&self.paging)
            }

            fn directives() -> &'static Directives {
                static CACHE: DirectiveCache = DirectiveCache::new();
                CACHE.get_or_parse(Self::FIELDS)
            }
        }

        check!(encode(&Wrapper { paging: None }).expect("null").is_empty());
        check!(encode(&Wrapper { paging: Some(Paging::default()) }).expect("zero").is_empty());

        let value = Wrapper {
            paging: Some(Paging {
                page: 0,
                per_page: Some(1),
            }),
        };
        let_assert!(Err(Error::Field { key, .. }) = encode(&value));
        check!(key == "paging");
    }

    #[test]
    fn zero_struct_checks_every_inspectable_field() {
        check!(Paging::default().fields_are_zero());
        check!(!(Paging { page: 1, per_page: None }).fields_are_zero());

        let mut value = search();
        check!(!value.fields_are_zero());
        value.text.clear();
        value.tags.clear();
        value.secret.clear();
        value.paging.page = 0;
        value.untagged = 0.0;
        // `internal` and `hidden_paging` are opaque
        check!(value.fields_are_zero());
    }
}
