//! Value coercion: turning typed values into their canonical query-string form.
//!
//! Every type that can appear in a query implements [`QueryValue`], which exposes a borrowed
//! [`Value`] view of its kind. [`stringify`] dispatches on that view, with one override: a type
//! whose [`QueryValue::render_text`] returns `Some` is rendered through it, even when its kind
//! would otherwise match a scalar.
//!
//! | kind | rendering |
//! |------|-----------|
//! | text capability | `render_text()` |
//! | string | identity |
//! | bool | `true` / `false` |
//! | integers | base-10 |
//! | floats | shortest round-trip decimal, exponent form outside `1e-4..1e6` |
//! | sequences | one string per element, or one joined string with a separator |
//!
//! Anything else fails with [`Error::NotConvertible`].

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::encode::EncodeInto;
use crate::{Error, Result};

/// Maximum number of characters kept in a [`Error::NotConvertible`] preview.
pub const PREVIEW_LEN: usize = 25;

/// Borrowed view of a value's kind.
pub enum Value<'a> {
    /// Text, rendered as-is.
    Str(&'a str),
    /// Boolean.
    Bool(bool),
    /// Signed integer of any width.
    Int(i128),
    /// Unsigned integer of any width.
    Uint(u128),
    /// Single-precision float.
    F32(f32),
    /// Double-precision float.
    F64(f64),
    /// Ordered elements of a slice, array or vector.
    Seq(Vec<&'a dyn QueryValue>),
    /// One level of nullable indirection (`Option<T>`).
    Indirect(Pointee<'a>),
    /// A struct encodable as a whole query, but not as a single value.
    Struct(&'a dyn EncodeInto),
    /// Any other shape; carries a rendering used only for diagnostics.
    Unsupported(String),
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Uint(u) => f.debug_tuple("Uint").field(u).finish(),
            Self::F32(x) => f.debug_tuple("F32").field(x).finish(),
            Self::F64(x) => f.debug_tuple("F64").field(x).finish(),
            Self::Seq(items) => f.debug_tuple("Seq").field(&items.len()).finish(),
            Self::Indirect(pointee) => f.debug_tuple("Indirect").field(pointee).finish(),
            Self::Struct(_) => f.write_str("Struct"),
            Self::Unsupported(preview) => f.debug_tuple("Unsupported").field(preview).finish(),
        }
    }
}

impl Value<'_> {
    /// Whether this is the zero value of its kind.
    ///
    /// Sequences are zero when empty, indirections when their pointee is zero, structs when
    /// every inspectable field is. Unsupported shapes are never zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Str(s) => s.is_empty(),
            Self::Bool(b) => !b,
            Self::Int(i) => *i == 0,
            Self::Uint(u) => *u == 0,
            Self::F32(x) => *x == 0.0,
            Self::F64(x) => *x == 0.0,
            Self::Seq(items) => items.is_empty(),
            Self::Indirect(pointee) => pointee.get().is_zero(),
            Self::Struct(inner) => inner.fields_are_zero(),
            Self::Unsupported(_) => false,
        }
    }
}

/// Target of a dereferenced `Option`: the held value, or the pointee's zero value for `None`.
pub enum Pointee<'a> {
    /// `Some(value)`.
    Borrowed(&'a dyn QueryValue),
    /// `None`, standing in as `T::default()`.
    Zero(Box<dyn QueryValue + 'a>),
}

impl Pointee<'_> {
    /// The dereferenced value.
    #[must_use]
    pub fn get(&self) -> &dyn QueryValue {
        match self {
            Self::Borrowed(value) => *value,
            Self::Zero(value) => value.as_ref(),
        }
    }

    /// Whether the pointer was `None`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Zero(_))
    }
}

impl fmt::Debug for Pointee<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Borrowed(value) => write!(f, "Borrowed({})", value.type_name()),
            Self::Zero(value) => write!(f, "Zero({})", value.type_name()),
        }
    }
}

/// A value usable in a query string.
///
/// Implement [`value`](Self::value) to describe the kind, and override
/// [`render_text`](Self::render_text) to give the type its own text form.
///
/// # Example
///
/// ```
/// use hitch_core::{QueryValue, Value, stringify};
///
/// struct Priority(u8);
///
/// impl QueryValue for Priority {
///     fn value(&self) -> Value<'_> {
///         Value::Uint(self.0.into())
///     }
///
///     fn render_text(&self) -> Option<String> {
///         Some(if self.0 > 5 { "high" } else { "low" }.to_string())
///     }
/// }
///
/// assert_eq!(stringify(&Priority(9), None).unwrap(), vec!["high"]);
/// ```
pub trait QueryValue {
    /// Kind view used for dispatch.
    fn value(&self) -> Value<'_>;

    /// Text-rendering capability; takes precedence over [`value`](Self::value).
    fn render_text(&self) -> Option<String> {
        None
    }

    /// Whether this is the zero value of its type.
    fn is_zero(&self) -> bool {
        self.value().is_zero()
    }

    /// Concrete type name, for diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Convert a value into its string form(s).
///
/// Sequences fan out into one string per element unless `separator` is given, in which case
/// they collapse into exactly one joined string. Scalars always yield one string and ignore the
/// separator.
///
/// # Errors
///
/// Returns [`Error::NotConvertible`] for maps, structs, nested sequences, and indirections.
pub fn stringify(value: &dyn QueryValue, separator: Option<&str>) -> Result<Vec<String>> {
    if let Some(text) = value.render_text() {
        return Ok(vec![text]);
    }

    let Value::Seq(items) = value.value() else {
        return scalar_to_string(value).map(|s| vec![s]);
    };

    let strings = items
        .into_iter()
        .map(scalar_to_string)
        .collect::<Result<Vec<_>>>()?;

    Ok(match separator {
        Some(separator) => vec![strings.join(separator)],
        None => strings,
    })
}

/// Convert a single element into exactly one string.
fn scalar_to_string(value: &dyn QueryValue) -> Result<String> {
    if let Some(text) = value.render_text() {
        return Ok(text);
    }

    match value.value() {
        Value::Str(s) => Ok(s.to_owned()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Uint(u) => Ok(u.to_string()),
        Value::F32(x) => Ok(float_to_string(x)),
        Value::F64(x) => Ok(float_to_string(x)),
        other => Err(not_convertible(value.type_name(), &other)),
    }
}

/// Shortest round-trip text of a float.
///
/// Magnitudes below `1e-4` or from `1e6` up use exponent form with a signed, two-digit
/// exponent (`1e+21`, `2.5e-07`). Infinities render as `+Inf` / `-Inf`.
fn float_to_string<F>(x: F) -> String
where
    F: Copy + Into<f64> + fmt::Display + fmt::LowerExp,
{
    let wide: f64 = x.into();
    if wide.is_nan() {
        return "NaN".to_string();
    }
    if wide.is_infinite() {
        return if wide > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let scientific = format!("{x:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return x.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();
    if (-4..6).contains(&exponent) {
        return x.to_string();
    }

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

fn not_convertible(type_name: &'static str, value: &Value<'_>) -> Error {
    let rendered = match value {
        Value::Seq(items) => format!("[{} elements]", items.len()),
        Value::Indirect(pointee) if pointee.is_null() => "<nil>".to_string(),
        Value::Indirect(pointee) => format!("&{}", pointee.get().type_name()),
        Value::Struct(inner) => inner.preview(),
        Value::Unsupported(rendered) => rendered.clone(),
        other => format!("{other:?}"),
    };
    Error::NotConvertible {
        type_name,
        preview: preview(&rendered),
    }
}

/// Truncate a rendering to [`PREVIEW_LEN`] characters, marking the cut with `...`.
#[must_use]
pub fn preview(rendered: &str) -> String {
    match rendered.char_indices().nth(PREVIEW_LEN) {
        Some((cut, _)) => format!("{}...", &rendered[..cut]),
        None => rendered.to_string(),
    }
}

/// Wrapper giving any [`Display`](fmt::Display) type the text-rendering capability.
///
/// The wrapped value is zero when it equals `T::default()`.
///
/// ```
/// use std::fmt;
///
/// use hitch_core::{AsText, QueryValue, stringify};
///
/// #[derive(Default, PartialEq)]
/// enum Sort {
///     #[default]
///     Relevance,
///     Newest,
/// }
///
/// impl fmt::Display for Sort {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         f.write_str(match self {
///             Self::Relevance => "relevance",
///             Self::Newest => "newest",
///         })
///     }
/// }
///
/// assert_eq!(stringify(&AsText(Sort::Newest), None).unwrap(), vec!["newest"]);
/// assert!(AsText(Sort::Relevance).is_zero());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AsText<T>(pub T);

impl<T: fmt::Display + Default + PartialEq> QueryValue for AsText<T> {
    fn value(&self) -> Value<'_> {
        Value::Unsupported(self.0.to_string())
    }

    fn render_text(&self) -> Option<String> {
        Some(self.0.to_string())
    }

    fn is_zero(&self) -> bool {
        self.0 == T::default()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

// ============================================================================
// Scalars
// ============================================================================

impl QueryValue for str {
    fn value(&self) -> Value<'_> {
        Value::Str(self)
    }
}

impl QueryValue for String {
    fn value(&self) -> Value<'_> {
        Value::Str(self)
    }
}

impl QueryValue for Cow<'_, str> {
    fn value(&self) -> Value<'_> {
        Value::Str(self)
    }
}

impl QueryValue for bool {
    fn value(&self) -> Value<'_> {
        Value::Bool(*self)
    }
}

macro_rules! impl_int {
    ($variant:ident => $($ty:ty),*) => {
        $(
            impl QueryValue for $ty {
                fn value(&self) -> Value<'_> {
                    Value::$variant((*self).into())
                }
            }
        )*
    };
}

impl_int!(Int => i8, i16, i32, i64, i128);
impl_int!(Uint => u8, u16, u32, u64, u128);

impl QueryValue for isize {
    fn value(&self) -> Value<'_> {
        // isize is at most 64 bits wide on every supported target
        Value::Int(*self as i128)
    }
}

impl QueryValue for usize {
    fn value(&self) -> Value<'_> {
        Value::Uint(*self as u128)
    }
}

impl QueryValue for f32 {
    fn value(&self) -> Value<'_> {
        Value::F32(*self)
    }
}

impl QueryValue for f64 {
    fn value(&self) -> Value<'_> {
        Value::F64(*self)
    }
}

// ============================================================================
// Sequences
// ============================================================================

impl<T: QueryValue> QueryValue for [T] {
    fn value(&self) -> Value<'_> {
        Value::Seq(self.iter().map(|item| item as &dyn QueryValue).collect())
    }
}

impl<T: QueryValue, const N: usize> QueryValue for [T; N] {
    fn value(&self) -> Value<'_> {
        self.as_slice().value()
    }

    /// Arrays are zero when every element is.
    fn is_zero(&self) -> bool {
        self.iter().all(QueryValue::is_zero)
    }
}

impl<T: QueryValue> QueryValue for Vec<T> {
    fn value(&self) -> Value<'_> {
        self.as_slice().value()
    }
}

impl<T: QueryValue> QueryValue for VecDeque<T> {
    fn value(&self) -> Value<'_> {
        Value::Seq(self.iter().map(|item| item as &dyn QueryValue).collect())
    }
}

// ============================================================================
// Indirection
// ============================================================================

impl<T: QueryValue + Default> QueryValue for Option<T> {
    fn value(&self) -> Value<'_> {
        Value::Indirect(match self {
            Some(value) => Pointee::Borrowed(value),
            None => Pointee::Zero(Box::new(T::default())),
        })
    }

    fn render_text(&self) -> Option<String> {
        self.as_ref().and_then(QueryValue::render_text)
    }
}

macro_rules! impl_transparent {
    ($($ptr:ty),*) => {
        $(
            impl<T: QueryValue + ?Sized> QueryValue for $ptr {
                fn value(&self) -> Value<'_> {
                    (**self).value()
                }

                fn render_text(&self) -> Option<String> {
                    (**self).render_text()
                }

                fn is_zero(&self) -> bool {
                    (**self).is_zero()
                }

                fn type_name(&self) -> &'static str {
                    (**self).type_name()
                }
            }
        )*
    };
}

impl_transparent!(&T, &mut T, Box<T>, Rc<T>, Arc<T>);

// ============================================================================
// Never convertible
// ============================================================================

impl<K: fmt::Debug, V: fmt::Debug, S> QueryValue for HashMap<K, V, S> {
    fn value(&self) -> Value<'_> {
        Value::Unsupported(format!("{self:?}"))
    }
}

impl<K: fmt::Debug, V: fmt::Debug> QueryValue for BTreeMap<K, V> {
    fn value(&self) -> Value<'_> {
        Value::Unsupported(format!("{self:?}"))
    }
}

impl QueryValue for () {
    fn value(&self) -> Value<'_> {
        Value::Unsupported("()".to_string())
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    /// Scalar kind with its own text form.
    struct Level(u8);

    impl QueryValue for Level {
        fn value(&self) -> Value<'_> {
            Value::Uint(self.0.into())
        }

        fn render_text(&self) -> Option<String> {
            Some(match self.0 {
                0 => "off".to_string(),
                1 => "warn".to_string(),
                _ => "debug".to_string(),
            })
        }
    }

    /// Same kind, without the capability.
    struct RawLevel(u8);

    impl QueryValue for RawLevel {
        fn value(&self) -> Value<'_> {
            Value::Uint(self.0.into())
        }
    }

    fn one(value: &dyn QueryValue) -> String {
        let mut strings = stringify(value, None).expect("convertible");
        check!(strings.len() == 1);
        strings.remove(0)
    }

    #[test]
    fn strings_are_identity() {
        check!(one(&"hello world") == "hello world");
        check!(one(&String::from("a&b")) == "a&b");
        check!(one(&Cow::Borrowed("")) == "");
    }

    #[test]
    fn bools_render_as_literals() {
        check!(one(&true) == "true");
        check!(one(&false) == "false");
    }

    #[test]
    fn integers_render_base_ten() {
        check!(one(&-42_i8) == "-42");
        check!(one(&7_u16) == "7");
        check!(one(&i64::MIN) == "-9223372036854775808");
        check!(one(&u128::MAX) == "340282366920938463463374607431768211455");
        check!(one(&0_usize) == "0");
        check!(one(&-1_isize) == "-1");
    }

    #[test]
    fn floats_render_shortest_round_trip() {
        check!(one(&0.1_f64) == "0.1");
        check!(one(&1.5_f32) == "1.5");
        check!(one(&0.1_f32) == "0.1");
        check!(one(&100.0_f64) == "100");
        check!(one(&-2.25_f64) == "-2.25");
    }

    #[test]
    fn sequences_fan_out() {
        let tags = vec!["x", "y", "z"];
        check!(stringify(&tags, None).expect("seq") == vec!["x", "y", "z"]);

        let numbers = [1_u32, 2, 3];
        check!(stringify(&numbers, None).expect("array") == vec!["1", "2", "3"]);
    }

    #[test]
    fn sequences_join_with_separator() {
        let tags = vec!["x", "y"];
        check!(stringify(&tags, Some(",")).expect("seq") == vec!["x,y"]);

        let empty: Vec<String> = Vec::new();
        check!(stringify(&empty, Some(",")).expect("seq") == vec![String::new()]);
        check!(stringify(&empty, None).expect("seq").is_empty());
    }

    #[test]
    fn separator_is_ignored_for_scalars() {
        check!(stringify(&5_i32, Some(";")).expect("scalar") == vec!["5"]);
    }

    #[test]
    fn text_capability_overrides_scalar_kind() {
        check!(one(&Level(1)) == "warn");
        check!(one(&RawLevel(1)) == "1");
    }

    #[test]
    fn text_capability_applies_per_element() {
        let levels = vec![Level(0), Level(2)];
        check!(stringify(&levels, Some("|")).expect("seq") == vec!["off|debug"]);
    }

    #[test]
    fn as_text_uses_display() {
        check!(one(&AsText('x')) == "x");
        check!(one(&AsText(std::num::Wrapping(12_u16))) == "12");
    }

    #[test]
    fn as_text_is_zero_at_default() {
        check!(AsText(0).is_zero());
        check!(AsText(String::new()).is_zero());
        check!(!AsText(7).is_zero());
        check!(!AsText("a".to_string()).is_zero());
    }

    #[test]
    fn transparent_pointers_forward() {
        check!(one(&Box::new(3_u8)) == "3");
        check!(one(&Arc::new(String::from("shared"))) == "shared");
        check!(one(&&&"deep") == "deep");
    }

    #[test]
    fn maps_are_not_convertible() {
        let mut map = BTreeMap::new();
        map.insert("a", 1);

        let_assert!(Err(Error::NotConvertible { type_name, preview }) = stringify(&map, None));
        check!(type_name.contains("BTreeMap"));
        check!(preview == r#"{"a": 1}"#);
    }

    #[test]
    fn nested_sequences_are_not_convertible() {
        let nested = vec![vec![1, 2], vec![3]];
        let_assert!(Err(Error::NotConvertible { type_name, .. }) = stringify(&nested, None));
        check!(type_name.contains("Vec<i32>"));
    }

    #[test]
    fn indirection_is_not_convertible_directly() {
        let_assert!(Err(Error::NotConvertible { preview, .. }) = stringify(&None::<u8>, None));
        check!(preview == "<nil>");
    }

    #[test]
    fn preview_truncates_to_twenty_five_chars() {
        check!(preview("short") == "short");
        check!(preview("abcdefghijklmnopqrstuvwxy") == "abcdefghijklmnopqrstuvwxy");
        check!(preview("abcdefghijklmnopqrstuvwxyz0123") == "abcdefghijklmnopqrstuvwxy...");
        check!(preview("ééééééééééééééééééééééééééé") == "ééééééééééééééééééééééééé...");
    }

    #[test]
    fn zero_values() {
        check!("".is_zero());
        check!(!"a".is_zero());
        check!(0_i32.is_zero());
        check!(false.is_zero());
        check!(0.0_f64.is_zero());
        check!(Vec::<u8>::new().is_zero());
        check!([0_u8, 0].is_zero());
        check!(![0_u8, 1].is_zero());
        check!(None::<u32>.is_zero());
        check!(Some(0_u32).is_zero());
        check!(!Some(3_u32).is_zero());
    }

    #[test]
    fn large_and_small_floats_use_exponent_form() {
        check!(one(&1e21_f64) == "1e+21");
        check!(one(&1e6_f64) == "1e+06");
        check!(one(&1_234_567.0_f64) == "1.234567e+06");
        check!(one(&123_456.0_f64) == "123456");
        check!(one(&0.0001_f64) == "0.0001");
        check!(one(&0.000_01_f64) == "1e-05");
        check!(one(&2.5e-7_f32) == "2.5e-07");
        check!(one(&1e100_f64) == "1e+100");
        check!(one(&0.0_f64) == "0");
    }

    #[test]
    fn non_finite_floats() {
        check!(one(&f64::INFINITY) == "+Inf");
        check!(one(&f32::NEG_INFINITY) == "-Inf");
        check!(one(&f64::NAN) == "NaN");
    }
}
