//! The attribute codec.
//!
//! [`Attribute`] converts one field value to and from its wire JSON form. The
//! derive macro calls it for every `attr`, `primary` and `client_id` field, so
//! any type used in those positions must implement it.
//!
//! Supported out of the box: `bool`, every integer kind, `f32`, `f64`,
//! `String`, [`DateTime<Utc>`], `Option<T>`, `Vec<T>`, [`serde_json::Value`]
//! and [`Json<T>`] for arbitrary serde types. Types with a canonical text form
//! (`Display + FromStr`) opt in through [`text_attribute!`](crate::text_attribute).

use crate::error::AttrError;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Per-field formatting options, taken from the `#[japi(attr = ...)]` flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AttrOptions {
    /// Encode timestamps as RFC 3339 text instead of Unix seconds.
    pub iso8601: bool,
    /// Drop the attribute from the document when its value is empty.
    pub omit_empty: bool,
}

impl AttrOptions {
    /// Options with every flag off.
    pub const PLAIN: Self = Self {
        iso8601: false,
        omit_empty: false,
    };
}

/// How a field type can serve as a resource key (primary or client-id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Native string.
    String,
    /// Any integer kind.
    Integer,
    /// A type with a canonical text form.
    Text,
    /// Cannot be a key.
    Unsupported,
}

impl KeyKind {
    /// Whether the kind can be stringified as an id.
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Conversion between a field value and its wire JSON value.
pub trait Attribute: Sized {
    /// Key capability of this type.
    const KEY: KeyKind = KeyKind::Unsupported;

    /// Converts the value to JSON.
    fn encode(&self, options: &AttrOptions) -> Result<Value, AttrError>;

    /// Builds a value from JSON.
    fn decode(value: Value, options: &AttrOptions) -> Result<Self, AttrError>;

    /// Whether the value counts as empty for `omitempty`.
    fn is_empty(&self) -> bool {
        false
    }

    /// Called when the document carries `null` for this field.
    ///
    /// `None` keeps the field's current (zero) value.
    fn decode_null() -> Option<Self> {
        None
    }

    /// The canonical id string, or `None` when the key is unset (zero/empty).
    fn to_key(&self) -> Option<String> {
        None
    }

    /// Parses an id string back into the key type.
    fn from_key(key: &str) -> Result<Self, AttrError> {
        let _ = key;
        Err(AttrError::TypeMismatch {
            expected: "key",
            detail: "type cannot hold an id".into(),
        })
    }
}

// --- Scalars ---

impl Attribute for bool {
    fn encode(&self, _options: &AttrOptions) -> Result<Value, AttrError> {
        Ok(Value::Bool(*self))
    }

    fn decode(value: Value, _options: &AttrOptions) -> Result<Self, AttrError> {
        value
            .as_bool()
            .ok_or_else(|| AttrError::mismatch("boolean", &value))
    }

    fn is_empty(&self) -> bool {
        !*self
    }
}

impl Attribute for String {
    const KEY: KeyKind = KeyKind::String;

    fn encode(&self, _options: &AttrOptions) -> Result<Value, AttrError> {
        Ok(Value::String(self.clone()))
    }

    fn decode(value: Value, _options: &AttrOptions) -> Result<Self, AttrError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(AttrError::mismatch("string", &other)),
        }
    }

    fn is_empty(&self) -> bool {
        String::is_empty(self)
    }

    fn to_key(&self) -> Option<String> {
        (!String::is_empty(self)).then(|| self.clone())
    }

    fn from_key(key: &str) -> Result<Self, AttrError> {
        Ok(key.to_owned())
    }
}

/// Reads a JSON number as a whole number, accepting floats without a fraction.
fn whole_number(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 1e38)
                    .map(|f| f as i128)
            }),
        _ => None,
    }
}

macro_rules! impl_integer_attribute {
    ($($t:ty),*) => {
        $(
            impl Attribute for $t {
                const KEY: KeyKind = KeyKind::Integer;

                fn encode(&self, _options: &AttrOptions) -> Result<Value, AttrError> {
                    Ok(Value::from(*self))
                }

                fn decode(value: Value, _options: &AttrOptions) -> Result<Self, AttrError> {
                    let wide = whole_number(&value)
                        .ok_or_else(|| AttrError::mismatch(stringify!($t), &value))?;
                    <$t>::try_from(wide).map_err(|_| AttrError::TypeMismatch {
                        expected: stringify!($t),
                        detail: format!("{wide} is out of range"),
                    })
                }

                fn is_empty(&self) -> bool {
                    *self == 0
                }

                fn to_key(&self) -> Option<String> {
                    (*self != 0).then(|| self.to_string())
                }

                fn from_key(key: &str) -> Result<Self, AttrError> {
                    key.parse().map_err(|e: std::num::ParseIntError| AttrError::TypeMismatch {
                        expected: stringify!($t),
                        detail: format!("id '{key}': {e}"),
                    })
                }
            }
        )*
    }
}

impl_integer_attribute!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

macro_rules! impl_float_attribute {
    ($($t:ty),*) => {
        $(
            impl Attribute for $t {
                fn encode(&self, _options: &AttrOptions) -> Result<Value, AttrError> {
                    serde_json::Number::from_f64(f64::from(*self))
                        .map(Value::Number)
                        .ok_or_else(|| AttrError::Unrepresentable(format!("{self}")))
                }

                fn decode(value: Value, _options: &AttrOptions) -> Result<Self, AttrError> {
                    value
                        .as_f64()
                        .map(|f| f as $t)
                        .ok_or_else(|| AttrError::mismatch("number", &value))
                }

                fn is_empty(&self) -> bool {
                    *self == 0.0
                }
            }
        )*
    }
}

impl_float_attribute!(f32, f64);

// --- Timestamps ---

/// `iso8601` fields encode as RFC 3339 text in UTC, with a fraction only when
/// the value has sub-second precision. Plain fields encode as whole Unix
/// seconds and drop any fraction.
impl Attribute for DateTime<Utc> {
    fn encode(&self, options: &AttrOptions) -> Result<Value, AttrError> {
        if options.iso8601 {
            Ok(Value::String(self.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
        } else {
            Ok(Value::from(self.timestamp()))
        }
    }

    fn decode(value: Value, options: &AttrOptions) -> Result<Self, AttrError> {
        if options.iso8601 {
            let Value::String(text) = value else {
                return Err(AttrError::BadTimestamp(format!(
                    "expected RFC 3339 text, found {}",
                    crate::error::json_kind(&value)
                )));
            };
            return DateTime::parse_from_rfc3339(&text)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| AttrError::BadTimestamp(format!("'{text}': {e}")));
        }
        let secs = whole_number(&value)
            .and_then(|n| i64::try_from(n).ok())
            .ok_or_else(|| AttrError::mismatch("unix timestamp", &value))?;
        Utc.timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| AttrError::BadTimestamp(format!("{secs} is out of range")))
    }

    fn is_empty(&self) -> bool {
        self.timestamp() == 0 && self.timestamp_subsec_nanos() == 0
    }
}

// --- Containers ---

impl<T: Attribute> Attribute for Option<T> {
    const KEY: KeyKind = T::KEY;

    fn encode(&self, options: &AttrOptions) -> Result<Value, AttrError> {
        match self {
            Some(inner) => inner.encode(options),
            None => Ok(Value::Null),
        }
    }

    fn decode(value: Value, options: &AttrOptions) -> Result<Self, AttrError> {
        match value {
            Value::Null => Ok(None),
            other => T::decode(other, options).map(Some),
        }
    }

    fn is_empty(&self) -> bool {
        self.is_none()
    }

    fn decode_null() -> Option<Self> {
        Some(None)
    }

    fn to_key(&self) -> Option<String> {
        self.as_ref().and_then(T::to_key)
    }

    fn from_key(key: &str) -> Result<Self, AttrError> {
        T::from_key(key).map(Some)
    }
}

impl<T: Attribute> Attribute for Vec<T> {
    fn encode(&self, options: &AttrOptions) -> Result<Value, AttrError> {
        self.iter()
            .map(|item| item.encode(options))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn decode(value: Value, options: &AttrOptions) -> Result<Self, AttrError> {
        match value {
            Value::Array(items) => items.into_iter().map(|v| T::decode(v, options)).collect(),
            other => Err(AttrError::mismatch("array", &other)),
        }
    }

    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

impl Attribute for Value {
    fn encode(&self, _options: &AttrOptions) -> Result<Value, AttrError> {
        Ok(self.clone())
    }

    fn decode(value: Value, _options: &AttrOptions) -> Result<Self, AttrError> {
        Ok(value)
    }

    fn is_empty(&self) -> bool {
        self.is_null()
    }

    fn decode_null() -> Option<Self> {
        Some(Value::Null)
    }
}

/// Stores any serde type as a nested JSON attribute value.
///
/// ```rust
/// use japi::{AttrOptions, Attribute, Json};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
/// struct Dimensions { width: u32, height: u32 }
///
/// let dims = Json(Dimensions { width: 3, height: 4 });
/// let wire = dims.encode(&AttrOptions::PLAIN).unwrap();
/// assert_eq!(wire["width"], 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> Attribute for Json<T> {
    fn encode(&self, _options: &AttrOptions) -> Result<Value, AttrError> {
        serde_json::to_value(&self.0).map_err(|e| AttrError::Unrepresentable(e.to_string()))
    }

    fn decode(value: Value, _options: &AttrOptions) -> Result<Self, AttrError> {
        serde_json::from_value(value)
            .map(Json)
            .map_err(|e| AttrError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                detail: e.to_string(),
            })
    }
}

/// Implements [`Attribute`] for types with a canonical text form.
///
/// The type must implement `Display` and `FromStr` (with a displayable
/// error). Values encode as JSON strings, decode through `FromStr`, and can be
/// used as primary keys or client ids.
///
/// ```rust
/// use std::{fmt, str::FromStr};
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// pub struct Sku(String);
///
/// impl fmt::Display for Sku {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
/// }
///
/// impl FromStr for Sku {
///     type Err = String;
///     fn from_str(s: &str) -> Result<Self, String> {
///         s.starts_with("sku-").then(|| Sku(s.to_owned())).ok_or_else(|| "no sku- prefix".into())
///     }
/// }
///
/// japi::text_attribute!(Sku);
/// ```
#[macro_export]
macro_rules! text_attribute {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::Attribute for $t {
                const KEY: $crate::attribute::KeyKind = $crate::attribute::KeyKind::Text;

                fn encode(
                    &self,
                    _options: &$crate::AttrOptions,
                ) -> ::core::result::Result<$crate::internal::serde_json::Value, $crate::AttrError> {
                    Ok($crate::internal::serde_json::Value::String(self.to_string()))
                }

                fn decode(
                    value: $crate::internal::serde_json::Value,
                    _options: &$crate::AttrOptions,
                ) -> ::core::result::Result<Self, $crate::AttrError> {
                    match value {
                        $crate::internal::serde_json::Value::String(text) => {
                            <Self as $crate::Attribute>::from_key(&text)
                        }
                        other => Err($crate::AttrError::mismatch(stringify!($t), &other)),
                    }
                }

                fn is_empty(&self) -> bool {
                    self.to_string().is_empty()
                }

                fn to_key(&self) -> ::core::option::Option<String> {
                    let text = self.to_string();
                    (!text.is_empty()).then_some(text)
                }

                fn from_key(key: &str) -> ::core::result::Result<Self, $crate::AttrError> {
                    key.parse::<$t>().map_err(|e| $crate::AttrError::TypeMismatch {
                        expected: stringify!($t),
                        detail: format!("'{key}': {e}"),
                    })
                }
            }
        )*
    };
}
