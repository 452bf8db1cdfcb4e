//! Cache keys
//!
//! Keys are strings or integer-valued numbers, stored under their textual
//! form. `1` and `"1"` therefore address the same entry.

use std::fmt;

use crate::error::{CacheError, Result};
use crate::value::Value;

/// A validated cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(String),
    Int(i64),
}

impl Key {
    /// The textual form the store is keyed by.
    pub fn storage_key(&self) -> String {
        self.to_string()
    }

    /// Empty string or zero.
    pub fn is_falsy(&self) -> bool {
        match self {
            Key::Str(s) => s.is_empty(),
            Key::Int(i) => *i == 0,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => f.write_str(s),
            Key::Int(i) => write!(f, "{}", i),
        }
    }
}

// == AsKey ==
/// Anything that may be offered as a key. Conversion fails with `EKEYTYPE`
/// naming the runtime type when the input is not a string or an
/// integer-valued number.
pub trait AsKey {
    fn to_key(&self) -> Result<Key>;

    /// Falsy keys short-circuit `ttl` and `get_ttl` before type validation.
    fn is_falsy(&self) -> bool {
        self.to_key().map(|key| key.is_falsy()).unwrap_or(false)
    }
}

impl<T: AsKey + ?Sized> AsKey for &T {
    fn to_key(&self) -> Result<Key> {
        (**self).to_key()
    }

    fn is_falsy(&self) -> bool {
        (**self).is_falsy()
    }
}

impl AsKey for Key {
    fn to_key(&self) -> Result<Key> {
        Ok(self.clone())
    }
}

impl AsKey for str {
    fn to_key(&self) -> Result<Key> {
        Ok(Key::Str(self.to_string()))
    }
}

impl AsKey for String {
    fn to_key(&self) -> Result<Key> {
        Ok(Key::Str(self.clone()))
    }
}

macro_rules! int_key {
    ($($ty:ty),*) => {
        $(
            impl AsKey for $ty {
                fn to_key(&self) -> Result<Key> {
                    Ok(i64::try_from(*self)
                        .map(Key::Int)
                        .unwrap_or_else(|_| Key::Str(self.to_string())))
                }
            }
        )*
    };
}

int_key!(i32, i64, u32, u64, usize);

impl AsKey for f64 {
    fn to_key(&self) -> Result<Key> {
        if !self.is_finite() || self.fract() != 0.0 {
            return Err(CacheError::key_type("number"));
        }
        if self.abs() < i64::MAX as f64 {
            Ok(Key::Int(*self as i64))
        } else {
            Ok(Key::Str(large_integer_text(*self)))
        }
    }

    fn is_falsy(&self) -> bool {
        *self == 0.0 || self.is_nan()
    }
}

/// Decimal text of an integral float beyond the `i64` range: plain digits
/// below 1e21, exponent form (`1e+21`) from there on.
fn large_integer_text(n: f64) -> String {
    if n.abs() < 1e21 {
        format!("{}", n)
    } else {
        let text = format!("{:e}", n);
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        }
    }
}

impl AsKey for bool {
    fn to_key(&self) -> Result<Key> {
        Err(CacheError::key_type("boolean"))
    }

    fn is_falsy(&self) -> bool {
        !*self
    }
}

impl AsKey for Value {
    fn to_key(&self) -> Result<Key> {
        match self {
            Value::String(s) => Ok(Key::Str(s.clone())),
            Value::Number(n) => n.to_key(),
            other => Err(CacheError::key_type(other.type_of())),
        }
    }

    fn is_falsy(&self) -> bool {
        !self.is_truthy()
    }
}

// == KeyList ==
/// An ordered sequence of keys for the batch operations. Validates every key
/// before any is used.
pub trait KeyList {
    fn to_keys(&self) -> Result<Vec<Key>>;
}

impl<T: KeyList + ?Sized> KeyList for &T {
    fn to_keys(&self) -> Result<Vec<Key>> {
        (**self).to_keys()
    }
}

impl<K: AsKey> KeyList for [K] {
    fn to_keys(&self) -> Result<Vec<Key>> {
        self.iter().map(AsKey::to_key).collect()
    }
}

impl<K: AsKey> KeyList for Vec<K> {
    fn to_keys(&self) -> Result<Vec<Key>> {
        self.as_slice().to_keys()
    }
}

impl<K: AsKey, const N: usize> KeyList for [K; N] {
    fn to_keys(&self) -> Result<Vec<Key>> {
        self.as_slice().to_keys()
    }
}

impl KeyList for Value {
    fn to_keys(&self) -> Result<Vec<Key>> {
        match self {
            Value::Array(items) => items.read().iter().map(AsKey::to_key).collect(),
            _ => Err(CacheError::KeysType),
        }
    }
}

// == Batch Entry ==
/// One element of an `mset` batch. Key and TTL stay dynamic so the whole
/// batch can be validated before anything is written.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub key: Value,
    pub val: Value,
    pub ttl: Option<Value>,
}

impl BatchEntry {
    pub fn new(key: impl Into<Value>, val: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: impl Into<Value>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    /// Numeric TTL in seconds, if one was given.
    ///
    /// A present, truthy, non-numeric TTL is an `ETTLTYPE` error; a falsy
    /// non-numeric one falls back to the default TTL.
    pub fn resolved_ttl(&self) -> Result<Option<f64>> {
        match &self.ttl {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(*n)),
            Some(other) if other.is_truthy() => Err(CacheError::TtlType),
            Some(_) => Ok(None),
        }
    }
}
