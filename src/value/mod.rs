//! Value Module
//!
//! The dynamic value model stored in the cache. Containers are shared and
//! mutable behind `Arc<RwLock<..>>`, so a value graph can alias and cycle the
//! way caller-held data does; [`crate::clone`] produces independent copies.
//!
//! `Value::clone()` is a reference copy. Use [`crate::clone::deep_clone`] for
//! a structural copy.

mod deferred;
mod function;
mod json;
mod object;
mod regexp;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use parking_lot::RwLock;

use crate::error::ValueError;

pub use deferred::{Deferred, Outcome};
pub use function::Function;
pub use json::{to_json, to_json_string};
pub use object::{MapValue, Object, Property, PropertyKey, SetValue, Slot, Symbol};
pub use regexp::RegExp;

/// Shared mutable cell used by every container variant.
pub type Shared<T> = Arc<RwLock<T>>;

pub(crate) fn share<T>(inner: T) -> Shared<T> {
    Arc::new(RwLock::new(inner))
}

fn address<T>(shared: &Shared<T>) -> usize {
    Arc::as_ptr(shared) as *const () as usize
}

// == Value ==
/// A dynamically shaped value.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Ordered sequence
    Array(Shared<Vec<Value>>),
    /// Associative container
    Map(Shared<MapValue>),
    /// Unique-element container
    Set(Shared<SetValue>),
    /// Plain structured object
    Object(Shared<Object>),
    /// Error-like object; `name` and `message` are non-enumerable own properties
    Error(Shared<Object>),
    /// Calendar timestamp (immutable instant)
    Date(DateTime<Utc>),
    RegExp(Shared<RegExp>),
    /// Raw byte buffer
    Bytes(Shared<Vec<u8>>),
    Deferred(Deferred),
    Function(Function),
}

impl Value {
    // == Constructors ==
    pub fn new_array(items: Vec<Value>) -> Self {
        Value::Array(share(items))
    }

    pub fn new_object<K, I>(pairs: I) -> Self
    where
        K: Into<PropertyKey>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut object = Object::new();
        for (key, value) in pairs {
            object.insert(key, value);
        }
        Value::Object(share(object))
    }

    pub fn from_object(object: Object) -> Self {
        Value::Object(share(object))
    }

    pub fn new_map<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        let mut map = MapValue::new();
        for (key, value) in pairs {
            map.insert(key, value);
        }
        Value::Map(share(map))
    }

    pub fn new_set<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut set = SetValue::new();
        for item in items {
            set.add(item);
        }
        Value::Set(share(set))
    }

    pub fn new_regexp(source: &str, flags: &str) -> Result<Self, ValueError> {
        Ok(Value::RegExp(share(RegExp::new(source, flags)?)))
    }

    pub fn new_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(share(bytes.into()))
    }

    /// Date from milliseconds since the Unix epoch; out-of-range input yields `None`.
    pub fn date_from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Value::Date)
    }

    pub fn new_error(name: &str, message: &str) -> Self {
        let mut object = Object::new();
        object.define("name", Property::hidden(Value::from(name)));
        object.define("message", Property::hidden(Value::from(message)));
        Value::Error(share(object))
    }

    pub fn new_function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Value::Function(Function::new(f))
    }

    // == Inspection ==
    /// Runtime type name, as reported in key-type errors.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            _ => "object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Shared<Vec<Value>>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Shared<MapValue>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Shared<SetValue>> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    /// The object cell of a plain or error-like object.
    pub fn as_object(&self) -> Option<&Shared<Object>> {
        match self {
            Value::Object(object) | Value::Error(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_regexp(&self) -> Option<&Shared<RegExp>> {
        match self {
            Value::RegExp(re) => Some(re),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Shared<Vec<u8>>> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Value::Deferred(deferred) => Some(deferred),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Reference identity of shared variants, `None` for plain data.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(address(items)),
            Value::Map(map) => Some(address(map)),
            Value::Set(set) => Some(address(set)),
            Value::Object(object) | Value::Error(object) => Some(address(object)),
            Value::RegExp(re) => Some(address(re)),
            Value::Bytes(bytes) => Some(address(bytes)),
            Value::Deferred(deferred) => Some(deferred.identity()),
            Value::Function(function) => Some(function.identity()),
            _ => None,
        }
    }

    /// Whether both values are the same shared instance.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        matches!((self.identity(), other.identity()), (Some(a), Some(b)) if a == b)
    }

    /// Key equality used by maps and sets: primitives by value (NaN equals
    /// NaN), dates by instant, everything else by identity.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            _ => self.ptr_eq(other),
        }
    }

    // == Property Access ==
    /// Reads a property of an object, following the prototype chain.
    /// Anything else, or a missing property, reads as `Undefined`.
    pub fn get_property(&self, key: impl Into<PropertyKey>) -> Value {
        let key = key.into();
        let mut current = self.clone();
        loop {
            let (own, prototype) = match current.as_object() {
                Some(object) => {
                    let object = object.read();
                    (object.own(&key).cloned(), object.prototype().cloned())
                }
                None => return Value::Undefined,
            };
            if let Some(property) = own {
                return property.read();
            }
            match prototype {
                Some(next) => current = next,
                None => return Value::Undefined,
            }
        }
    }

    /// Assigns a property on an object.
    ///
    /// Returns `false` without changing anything when the assignment is not
    /// permitted: a read-only data property or an accessor without setter,
    /// either own or inherited. Inherited setters are invoked.
    pub fn set_property(&self, key: impl Into<PropertyKey>, value: Value) -> bool {
        let Some(target) = self.as_object() else {
            return false;
        };
        let key = key.into();

        let own = target.read().own(&key).cloned();
        if let Some(property) = own {
            return match &property.slot {
                Slot::Data(_) if property.writable => {
                    target.write().define(
                        key,
                        Property {
                            slot: Slot::Data(value),
                            ..property
                        },
                    );
                    true
                }
                Slot::Data(_) | Slot::Accessor { set: None, .. } => false,
                Slot::Accessor {
                    set: Some(setter), ..
                } => {
                    setter.call(&[value]);
                    true
                }
            };
        }

        let mut prototype = target.read().prototype().cloned();
        while let Some(current) = prototype {
            let (inherited, next) = match current.as_object() {
                Some(object) => {
                    let object = object.read();
                    (object.own(&key).cloned(), object.prototype().cloned())
                }
                None => (None, None),
            };
            if let Some(property) = inherited {
                match &property.slot {
                    Slot::Data(_) if property.writable => break,
                    Slot::Data(_) | Slot::Accessor { set: None, .. } => return false,
                    Slot::Accessor {
                        set: Some(setter), ..
                    } => {
                        setter.call(&[value]);
                        return true;
                    }
                }
            }
            prototype = next;
        }

        target.write().insert(key, value);
        true
    }

    /// Element of an array, `Undefined` when out of range or not an array.
    pub fn index(&self, index: usize) -> Value {
        self.as_array()
            .and_then(|items| items.read().get(index).cloned())
            .unwrap_or(Value::Undefined)
    }

    /// Appends to an array. Returns `false` for anything else.
    pub fn push(&self, item: Value) -> bool {
        match self.as_array() {
            Some(items) => {
                items.write().push(item);
                true
            }
            None => false,
        }
    }

    // == Structural Equality ==
    /// Deep structural equality. Terminates on cyclic graphs; callables and
    /// deferred values compare by identity, patterns by source and flags,
    /// objects by their own enumerable properties.
    pub fn deep_eq(&self, other: &Value) -> bool {
        self.deep_eq_inner(other, &mut HashSet::new())
    }

    fn deep_eq_inner(&self, other: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
        if let (Some(a), Some(b)) = (self.identity(), other.identity()) {
            if a == b || !seen.insert((a, b)) {
                return true;
            }
        }

        match (self, other) {
            (Value::Array(a), Value::Array(b)) => {
                let (a, b) = (a.read().clone(), b.read().clone());
                a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| x.deep_eq_inner(y, seen))
            }
            (Value::Map(a), Value::Map(b)) => {
                let (a, b) = (a.read().clone(), b.read().clone());
                a.len() == b.len()
                    && a.entries().iter().zip(b.entries()).all(|((ka, va), (kb, vb))| {
                        ka.deep_eq_inner(kb, seen) && va.deep_eq_inner(vb, seen)
                    })
            }
            (Value::Set(a), Value::Set(b)) => {
                let (a, b) = (a.read().clone(), b.read().clone());
                a.len() == b.len()
                    && a.items().iter().zip(b.items()).all(|(x, y)| x.deep_eq_inner(y, seen))
            }
            (Value::Object(a), Value::Object(b)) | (Value::Error(a), Value::Error(b)) => {
                let enumerable = |object: &Shared<Object>| -> Vec<(PropertyKey, Property)> {
                    object
                        .read()
                        .properties()
                        .iter()
                        .filter(|(_, property)| property.enumerable)
                        .cloned()
                        .collect()
                };
                let (a, b) = (enumerable(a), enumerable(b));
                a.len() == b.len()
                    && a.iter().all(|(key, pa)| {
                        b.iter()
                            .find(|(k, _)| k == key)
                            .is_some_and(|(_, pb)| pa.read().deep_eq_inner(&pb.read(), seen))
                    })
            }
            (Value::RegExp(a), Value::RegExp(b)) => {
                let (a, b) = (a.read(), b.read());
                a.source() == b.source() && a.flags() == b.flags()
            }
            (Value::Bytes(a), Value::Bytes(b)) => *a.read() == *b.read(),
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self.same_value_zero(other),
        }
    }

    // == Debug Rendering ==
    fn write_debug(&self, f: &mut fmt::Formatter<'_>, ancestors: &mut Vec<usize>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Date(d) => write!(f, "Date({})", d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::RegExp(re) => write!(f, "{:?}", *re.read()),
            Value::Bytes(bytes) => {
                f.write_str("<Buffer")?;
                for byte in bytes.read().iter() {
                    write!(f, " {:02x}", byte)?;
                }
                f.write_str(">")
            }
            Value::Deferred(deferred) => write!(f, "{:?}", deferred),
            Value::Function(function) => write!(f, "{:?}", function),
            Value::Array(_) | Value::Map(_) | Value::Set(_) | Value::Object(_) | Value::Error(_) => {
                let id = self.identity().unwrap_or_default();
                if ancestors.contains(&id) {
                    return f.write_str("[Circular]");
                }
                ancestors.push(id);
                let result = self.write_container(f, ancestors);
                ancestors.pop();
                result
            }
        }
    }

    fn write_container(&self, f: &mut fmt::Formatter<'_>, ancestors: &mut Vec<usize>) -> fmt::Result {
        match self {
            Value::Array(items) => {
                let items = items.read().clone();
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write_debug(f, ancestors)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                let map = map.read().clone();
                f.write_str("Map {")?;
                for (i, (key, value)) in map.entries().iter().enumerate() {
                    f.write_str(if i > 0 { ", " } else { " " })?;
                    key.write_debug(f, ancestors)?;
                    f.write_str(" => ")?;
                    value.write_debug(f, ancestors)?;
                }
                f.write_str(" }")
            }
            Value::Set(set) => {
                let set = set.read().clone();
                f.write_str("Set {")?;
                for (i, item) in set.items().iter().enumerate() {
                    f.write_str(if i > 0 { ", " } else { " " })?;
                    item.write_debug(f, ancestors)?;
                }
                f.write_str(" }")
            }
            Value::Object(object) | Value::Error(object) => {
                let properties = object.read().properties().to_vec();
                if matches!(self, Value::Error(_)) {
                    f.write_str("Error ")?;
                }
                f.write_str("{")?;
                for (i, (key, property)) in properties.iter().enumerate() {
                    f.write_str(if i > 0 { ", " } else { " " })?;
                    match key {
                        PropertyKey::Name(name) => write!(f, "{}: ", name)?,
                        PropertyKey::Symbol(symbol) => write!(f, "[{:?}]: ", symbol)?,
                    }
                    match &property.slot {
                        Slot::Data(value) => value.write_debug(f, ancestors)?,
                        Slot::Accessor { .. } => f.write_str("[Accessor]")?,
                    }
                }
                f.write_str(" }")
            }
            _ => self.write_debug(f, ancestors),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_debug(f, &mut Vec::new())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

// == Conversions ==
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Deferred> for Value {
    fn from(d: Deferred) -> Self {
        Value::Deferred(d)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::new_array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        option.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::new_array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::new_object(map.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}
