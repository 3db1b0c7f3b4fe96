//! Value model: raw SQL fragments, typed bindings and statement operands.
//!
//! A statement operand is either a [`Raw`] fragment that is spliced into the
//! SQL verbatim, an explicitly typed [`Binding`], or a plain [`Scalar`] whose
//! binding kind is inferred. At compile time every operand resolves to a
//! [`ResolvedValue`]: literal text, or one placeholder plus one binding.

use crate::error::{QbError, QbResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder format of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    /// `%s`
    String,
    /// `%d`, rendered as `1` / `0`
    Bool,
    /// `%d`
    Int,
    /// `%f`
    Float,
    /// `%s`, value serialized as JSON text
    Json,
}

impl BindingKind {
    /// The format token this kind is emitted as.
    pub fn placeholder(self) -> &'static str {
        match self {
            BindingKind::String | BindingKind::Json => "%s",
            BindingKind::Bool | BindingKind::Int => "%d",
            BindingKind::Float => "%f",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BindingKind::String => "string",
            BindingKind::Bool => "bool",
            BindingKind::Int => "int",
            BindingKind::Float => "float",
            BindingKind::Json => "json",
        }
    }
}

impl FromStr for BindingKind {
    type Err = QbError;

    fn from_str(s: &str) -> QbResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(BindingKind::String),
            "bool" | "boolean" => Ok(BindingKind::Bool),
            "int" | "integer" => Ok(BindingKind::Int),
            "float" | "double" => Ok(BindingKind::Float),
            "json" => Ok(BindingKind::Json),
            _ => Err(QbError::InvalidBindingKind(s.to_string())),
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar value destined for a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Json(serde_json::Value),
}

impl Scalar {
    /// Binding kind implied by the variant. `Null` has none.
    pub fn inferred_kind(&self) -> Option<BindingKind> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(_) => Some(BindingKind::Bool),
            Scalar::Int(_) => Some(BindingKind::Int),
            Scalar::Float(_) => Some(BindingKind::Float),
            Scalar::String(_) => Some(BindingKind::String),
            Scalar::Json(_) => Some(BindingKind::Json),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    fn as_text(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::String(s) => s.clone(),
            Scalar::Json(v) => v.to_string(),
        }
    }

    fn as_i64(&self) -> i64 {
        match self {
            Scalar::Null => 0,
            Scalar::Bool(b) => i64::from(*b),
            Scalar::Int(i) => *i,
            Scalar::Float(f) => *f as i64,
            Scalar::String(s) => parse_leading_number(s) as i64,
            Scalar::Json(v) => v
                .as_i64()
                .or_else(|| v.as_f64().map(|f| f as i64))
                .unwrap_or(0),
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            Scalar::Null => 0.0,
            Scalar::Bool(b) => f64::from(u8::from(*b)),
            Scalar::Int(i) => *i as f64,
            Scalar::Float(f) => *f,
            Scalar::String(s) => parse_leading_number(s),
            Scalar::Json(v) => v.as_f64().unwrap_or(0.0),
        }
    }
}

/// `sprintf`-style numeric coercion: the longest numeric prefix, else 0.
fn parse_leading_number(s: &str) -> f64 {
    let s = s.trim_start();
    let mut end = 0;
    for (i, c) in s.char_indices() {
        let ok = c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0);
        if !ok {
            break;
        }
        end = i + c.len_utf8();
    }
    (0..=end)
        .rev()
        .find_map(|n| s[..n].parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Quote a string the way MySQL string literals expect.
pub(crate) fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

macro_rules! impl_scalar_from {
    ($($t:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Scalar::$variant(<$conv>::from(v))
                }
            }

            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Plain(Scalar::from(v))
                }
            }
        )*
    };
}

impl_scalar_from!(
    bool => Bool as bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
    String => String as String,
    &str => String as String,
    serde_json::Value => Json as serde_json::Value,
);

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map_or(Scalar::Null, Into::into)
    }
}

/// A typed scalar paired with its placeholder format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    value: Scalar,
    kind: BindingKind,
}

impl Binding {
    /// Create a binding with an explicit kind.
    pub fn new(value: impl Into<Scalar>, kind: BindingKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }

    /// Create a binding from a textual kind (`"string"`, `"int"`, ...).
    pub fn with_kind(value: impl Into<Scalar>, kind: &str) -> QbResult<Self> {
        Ok(Self::new(value, kind.parse()?))
    }

    /// Create a binding from an optional textual kind.
    ///
    /// A missing kind is an error: untyped values are never turned into raw
    /// SQL implicitly. Use [`Raw`] for unescaped fragments.
    pub fn from_parts(value: impl Into<Scalar>, kind: Option<&str>) -> QbResult<Self> {
        match kind {
            Some(kind) => Self::with_kind(value, kind),
            None => Err(QbError::InvalidBindingKind(
                "a binding kind is required".to_string(),
            )),
        }
    }

    /// Create a binding whose kind is inferred from the value.
    pub fn infer(value: impl Into<Scalar>) -> QbResult<Self> {
        let value = value.into();
        let kind = value.inferred_kind().ok_or_else(|| {
            QbError::InvalidBindingKind("cannot infer a kind for NULL".to_string())
        })?;
        Ok(Self { value, kind })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(value.into(), BindingKind::String)
    }

    pub fn int(value: i64) -> Self {
        Self::new(value, BindingKind::Int)
    }

    pub fn float(value: f64) -> Self {
        Self::new(value, BindingKind::Float)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(value, BindingKind::Bool)
    }

    /// Serialize any value into a JSON binding.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::to_value(value)?, BindingKind::Json))
    }

    pub fn value(&self) -> &Scalar {
        &self.value
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    pub fn placeholder(&self) -> &'static str {
        self.kind.placeholder()
    }

    /// Null, or a float that SQL cannot represent (NaN, infinities).
    pub fn is_sql_null(&self) -> bool {
        self.value.is_null()
            || (self.kind == BindingKind::Float && !self.value.as_f64().is_finite())
    }

    /// Render the binding as an escaped SQL literal, as a prepared-statement
    /// executor would substitute it into its placeholder.
    pub fn to_sql_literal(&self) -> String {
        if self.is_sql_null() {
            return "NULL".to_string();
        }
        match self.kind {
            BindingKind::String | BindingKind::Json => quote_string(&self.value.as_text()),
            BindingKind::Bool | BindingKind::Int => self.value.as_i64().to_string(),
            BindingKind::Float => format!("{:.6}", self.value.as_f64()),
        }
    }
}

/// A literal SQL fragment, inserted verbatim and never escaped.
///
/// The fragment may carry its own bindings; they are interpolated into the
/// text when the fragment is resolved, so the result can be embedded anywhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Raw {
    sql: String,
    bindings: Vec<Binding>,
}

impl Raw {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: Vec::new(),
        }
    }

    /// Create a fragment whose `%s`/`%d`/`%f` tokens are filled by `bindings`.
    pub fn with_bindings(sql: impl Into<String>, bindings: Vec<Binding>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn has_bindings(&self) -> bool {
        !self.bindings.is_empty()
    }
}

impl fmt::Display for Raw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// A statement operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Spliced in literally.
    Raw(Raw),
    /// Bound with an explicit kind.
    Bound(Binding),
    /// Bound with the kind inferred from the scalar.
    Plain(Scalar),
}

/// What an operand turns into at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// Text spliced into the SQL, contributing no binding.
    Literal(Raw),
    /// One placeholder plus one binding.
    Typed(Binding),
}

impl Value {
    pub fn raw(sql: impl Into<String>) -> Self {
        Value::Raw(Raw::new(sql))
    }

    pub fn null() -> Self {
        Value::Plain(Scalar::Null)
    }

    /// Serialize any value into a JSON-kind operand.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        Ok(Value::Bound(Binding::json(value)?))
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Value::Raw(_))
    }

    /// Nulls and non-finite floats resolve to a `NULL` literal.
    pub fn resolved_value(&self) -> ResolvedValue {
        let binding = match self {
            Value::Raw(raw) => return ResolvedValue::Literal(raw.clone()),
            Value::Bound(binding) => binding.clone(),
            Value::Plain(scalar) => match scalar.inferred_kind() {
                Some(kind) => Binding::new(scalar.clone(), kind),
                None => return ResolvedValue::Literal(Raw::new("NULL")),
            },
        };
        if binding.is_sql_null() {
            ResolvedValue::Literal(Raw::new("NULL"))
        } else {
            ResolvedValue::Typed(binding)
        }
    }
}

impl From<Raw> for Value {
    fn from(raw: Raw) -> Self {
        Value::Raw(raw)
    }
}

impl From<Binding> for Value {
    fn from(binding: Binding) -> Self {
        Value::Bound(binding)
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Plain(scalar)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        Value::Plain(v.into())
    }
}

/// Ordered bindings collected while emitting SQL.
///
/// Every push returns the placeholder to emit, so text and bindings cannot
/// drift apart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BindingList {
    bindings: Vec<Binding>,
}

impl BindingList {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Add a binding and return its placeholder token.
    pub fn push(&mut self, binding: Binding) -> &'static str {
        let placeholder = binding.placeholder();
        self.bindings.push(binding);
        placeholder
    }

    /// Resolve an operand, returning the SQL text to emit in its place.
    ///
    /// Literals are interpolated and add no binding.
    pub fn push_value(&mut self, value: &Value) -> String {
        match value.resolved_value() {
            ResolvedValue::Literal(raw) => crate::normalize::interpolate(&raw),
            ResolvedValue::Typed(binding) => self.push(binding).to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn extend(&mut self, other: BindingList) {
        self.bindings.extend(other.bindings);
    }

    pub fn as_slice(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn into_vec(self) -> Vec<Binding> {
        self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_placeholders() {
        assert_eq!(BindingKind::String.placeholder(), "%s");
        assert_eq!(BindingKind::Bool.placeholder(), "%d");
        assert_eq!(BindingKind::Int.placeholder(), "%d");
        assert_eq!(BindingKind::Float.placeholder(), "%f");
        assert_eq!(BindingKind::Json.placeholder(), "%s");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("INT".parse::<BindingKind>().unwrap(), BindingKind::Int);
        assert_eq!("boolean".parse::<BindingKind>().unwrap(), BindingKind::Bool);
        let err = "decimal".parse::<BindingKind>().unwrap_err();
        assert!(matches!(err, QbError::InvalidBindingKind(k) if k == "decimal"));
    }

    #[test]
    fn test_binding_requires_kind() {
        assert!(Binding::from_parts("x", Some("string")).is_ok());
        assert!(matches!(
            Binding::from_parts("x", None),
            Err(QbError::InvalidBindingKind(_))
        ));
        assert!(matches!(
            Binding::infer(Scalar::Null),
            Err(QbError::InvalidBindingKind(_))
        ));
    }

    #[test]
    fn test_resolved_value() {
        assert_eq!(
            Value::from(24).resolved_value(),
            ResolvedValue::Typed(Binding::int(24))
        );
        assert_eq!(
            Value::raw("NOW()").resolved_value(),
            ResolvedValue::Literal(Raw::new("NOW()"))
        );
        assert_eq!(
            Value::null().resolved_value(),
            ResolvedValue::Literal(Raw::new("NULL"))
        );
        assert_eq!(
            Value::from(Some(1.5)).resolved_value(),
            ResolvedValue::Typed(Binding::float(1.5))
        );
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(Binding::string("O'Brien").to_sql_literal(), r"'O\'Brien'");
        assert_eq!(Binding::bool(true).to_sql_literal(), "1");
        assert_eq!(Binding::float(2.5).to_sql_literal(), "2.500000");
        assert_eq!(Binding::new("12abc", BindingKind::Int).to_sql_literal(), "12");
        assert_eq!(Binding::new(Scalar::Null, BindingKind::Int).to_sql_literal(), "NULL");
        assert_eq!(
            Binding::json(&serde_json::json!({"a": 1})).unwrap().to_sql_literal(),
            r#"'{\"a\":1}'"#
        );
    }

    #[test]
    fn test_non_finite_floats_are_null() {
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(Binding::float(f).to_sql_literal(), "NULL");
            assert_eq!(
                Value::from(f).resolved_value(),
                ResolvedValue::Literal(Raw::new("NULL"))
            );
            assert_eq!(
                Value::from(Binding::float(f)).resolved_value(),
                ResolvedValue::Literal(Raw::new("NULL"))
            );
        }
        // Only the float rendering is affected.
        assert_eq!(Binding::string("NaN").to_sql_literal(), "'NaN'");
        assert!(!Binding::float(0.0).is_sql_null());
        assert!(Binding::new(Scalar::Null, BindingKind::Float).is_sql_null());
    }

    #[test]
    fn test_binding_list_placeholders() {
        let mut list = BindingList::new();
        assert_eq!(list.push_value(&Value::from("a")), "%s");
        assert_eq!(list.push_value(&Value::from(3)), "%d");
        assert_eq!(list.push_value(&Value::raw("NOW()")), "NOW()");
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[1], Binding::int(3));
    }
}
