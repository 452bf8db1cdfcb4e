//! Structured values: plain objects with a prototype link and attributed
//! properties, plus the insertion-ordered map and set containers.

use std::fmt;
use std::sync::Arc;

use super::{Function, Value};

// == Symbol ==
/// A unique property key. Two symbols are equal only if they are the same
/// symbol, whatever their descriptions.
#[derive(Clone)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(description: &str) -> Self {
        Self(Arc::from(description))
    }

    pub fn description(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

// == Property Key ==
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyKey {
    Name(String),
    Symbol(Symbol),
}

impl PropertyKey {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            PropertyKey::Name(name) => Some(name),
            PropertyKey::Symbol(_) => None,
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::Name(name.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        PropertyKey::Name(name)
    }
}

impl From<&Symbol> for PropertyKey {
    fn from(symbol: &Symbol) -> Self {
        PropertyKey::Symbol(symbol.clone())
    }
}

impl From<Symbol> for PropertyKey {
    fn from(symbol: Symbol) -> Self {
        PropertyKey::Symbol(symbol)
    }
}

// == Property ==
/// Where a property's value lives.
#[derive(Clone, Debug)]
pub enum Slot {
    Data(Value),
    Accessor {
        get: Option<Function>,
        set: Option<Function>,
    },
}

/// An own property with its attributes.
#[derive(Clone, Debug)]
pub struct Property {
    pub slot: Slot,
    pub enumerable: bool,
    /// Only meaningful for data properties
    pub writable: bool,
    pub configurable: bool,
}

impl Property {
    /// An enumerable, writable, configurable data property.
    pub fn data(value: Value) -> Self {
        Self {
            slot: Slot::Data(value),
            enumerable: true,
            writable: true,
            configurable: true,
        }
    }

    /// A non-enumerable, writable, configurable data property.
    pub fn hidden(value: Value) -> Self {
        Self {
            enumerable: false,
            ..Self::data(value)
        }
    }

    /// An enumerable, configurable accessor property.
    pub fn accessor(get: Option<Function>, set: Option<Function>) -> Self {
        Self {
            slot: Slot::Accessor { get, set },
            enumerable: true,
            writable: false,
            configurable: true,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn non_enumerable(mut self) -> Self {
        self.enumerable = false;
        self
    }

    /// Current value: the data, or the getter's result.
    pub fn read(&self) -> Value {
        match &self.slot {
            Slot::Data(value) => value.clone(),
            Slot::Accessor { get: Some(getter), .. } => getter.call(&[]),
            Slot::Accessor { get: None, .. } => Value::Undefined,
        }
    }
}

// == Object ==
/// A plain structured value. Own properties keep their definition order.
#[derive(Clone, Debug, Default)]
pub struct Object {
    prototype: Option<Value>,
    properties: Vec<(PropertyKey, Property)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty object whose inherited lookups fall back to `prototype`.
    pub fn with_prototype(prototype: Option<Value>) -> Self {
        Self {
            prototype,
            properties: Vec::new(),
        }
    }

    pub fn prototype(&self) -> Option<&Value> {
        self.prototype.as_ref()
    }

    pub fn set_prototype(&mut self, prototype: Option<Value>) {
        self.prototype = prototype;
    }

    pub fn own(&self, key: &PropertyKey) -> Option<&Property> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, property)| property)
    }

    /// Defines or replaces an own property, keeping its original position on replace.
    pub fn define(&mut self, key: impl Into<PropertyKey>, property: Property) {
        let key = key.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = property,
            None => self.properties.push((key, property)),
        }
    }

    /// Defines a plain data property.
    pub fn insert(&mut self, key: impl Into<PropertyKey>, value: Value) {
        self.define(key, Property::data(value));
    }

    pub fn remove(&mut self, key: &PropertyKey) -> Option<Property> {
        let index = self.properties.iter().position(|(k, _)| k == key)?;
        Some(self.properties.remove(index).1)
    }

    pub fn properties(&self) -> &[(PropertyKey, Property)] {
        &self.properties
    }

    /// Own enumerable string keys, in order.
    pub fn keys(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|(_, property)| property.enumerable)
            .filter_map(|(key, _)| key.as_name().map(str::to_string))
            .collect()
    }
}

// == Map ==
/// Insertion-ordered associative container. Keys compare with
/// [`Value::same_value_zero`], so containers are keyed by identity.
#[derive(Clone, Debug, Default)]
pub struct MapValue {
    entries: Vec<(Value, Value)>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.same_value_zero(key))
            .map(|(_, v)| v)
    }

    pub fn has(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    /// Inserts or replaces, keeping the original position on replace.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k.same_value_zero(key))?;
        Some(self.entries.remove(index).1)
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Set ==
/// Insertion-ordered unique-element container.
#[derive(Clone, Debug, Default)]
pub struct SetValue {
    items: Vec<Value>,
}

impl SetValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, item: &Value) -> bool {
        self.items.iter().any(|i| i.same_value_zero(item))
    }

    /// Adds `item` unless already present. Returns whether it was added.
    pub fn add(&mut self, item: Value) -> bool {
        if self.has(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, item: &Value) -> bool {
        let before = self.items.len();
        self.items.retain(|i| !i.same_value_zero(item));
        self.items.len() != before
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
