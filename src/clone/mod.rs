//! Deep-Clone Engine
//!
//! Recursively duplicates a value graph so that the copy shares no mutable
//! structure with the source. Dispatch follows a fixed priority:
//!
//! 1. `Null` clones to `Null`
//! 2. an exhausted depth budget returns the source reference unchanged
//! 3. primitives, dates and functions are returned as-is
//! 4. maps, sets, deferred values, arrays, patterns, byte buffers, error-like
//!    objects and plain objects each get a fresh container
//!
//! Cycles are handled by remembering, per top-level call, which clone was
//! created for each source identity.

use std::collections::HashMap;

use tracing::trace;

use crate::value::{share, Deferred, MapValue, Object, Property, PropertyKey, SetValue, Shared, Slot, Value};

// == Clone Options ==
/// Knobs for [`deep_clone_with`].
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Track visited containers so cyclic graphs clone into equally cyclic
    /// copies. Only disable for graphs known to be acyclic.
    pub circular: bool,
    /// Maximum depth to clone, `None` for unbounded. Below the limit the
    /// source references are kept.
    pub depth: Option<usize>,
    /// Prototype for cloned plain objects instead of the source's own.
    pub prototype: Option<Value>,
    /// Also copy non-enumerable own properties, keeping their attributes.
    pub include_non_enumerable: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            circular: true,
            depth: None,
            prototype: None,
            include_non_enumerable: false,
        }
    }
}

impl CloneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_circular(mut self, circular: bool) -> Self {
        self.circular = circular;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_prototype(mut self, prototype: Value) -> Self {
        self.prototype = Some(prototype);
        self
    }

    pub fn with_non_enumerable(mut self, include: bool) -> Self {
        self.include_non_enumerable = include;
        self
    }
}

// == Public Entry Points ==
/// Deep-clones `value` with default options.
///
/// Cycles in the source are reproduced in the copy. Containers are reference
/// counted, so a cyclic copy is never freed; acyclic copies are released as
/// soon as the last handle drops.
pub fn deep_clone(value: &Value) -> Value {
    deep_clone_with(value, &CloneOptions::default())
}

/// Deep-clones `value`.
pub fn deep_clone_with(value: &Value, options: &CloneOptions) -> Value {
    Cloner::new(options).clone_value(value, options.depth)
}

/// Creates an empty object whose prototype is `value` itself, so every
/// property of `value` is visible through it without being copied.
pub fn clone_prototype(value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    Value::from_object(Object::with_prototype(Some(value.clone())))
}

// == Cloner ==
struct Cloner<'a> {
    options: &'a CloneOptions,
    /// Source identity -> clone already created for it
    visited: HashMap<usize, Value>,
}

impl<'a> Cloner<'a> {
    fn new(options: &'a CloneOptions) -> Self {
        Self {
            options,
            visited: HashMap::new(),
        }
    }

    fn clone_value(&mut self, value: &Value, depth: Option<usize>) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        if depth == Some(0) {
            return value.clone();
        }
        let Some(id) = value.identity() else {
            return value.clone();
        };
        match value {
            Value::Function(_) => return value.clone(),
            Value::Bytes(bytes) => return Value::new_bytes(bytes.read().clone()),
            _ => {}
        }
        if self.options.circular {
            if let Some(existing) = self.visited.get(&id) {
                return existing.clone();
            }
        }

        let depth = depth.map(|d| d - 1);
        match value {
            Value::Map(source) => {
                let child = share(MapValue::new());
                let out = self.remember(id, Value::Map(child.clone()));
                let entries = source.read().entries().to_vec();
                for (key, entry) in &entries {
                    let key = self.clone_value(key, depth);
                    let entry = self.clone_value(entry, depth);
                    child.write().insert(key, entry);
                }
                out
            }
            Value::Set(source) => {
                let child = share(SetValue::new());
                let out = self.remember(id, Value::Set(child.clone()));
                let items = source.read().items().to_vec();
                for item in &items {
                    let item = self.clone_value(item, depth);
                    child.write().add(item);
                }
                out
            }
            Value::Deferred(source) => {
                let child = Deferred::new();
                let out = self.remember(id, Value::Deferred(child.clone()));
                let options = self.options.clone();
                source.on_settle(move |outcome| {
                    let mut cloner = Cloner::new(&options);
                    match outcome {
                        Ok(resolved) => child.resolve(cloner.clone_value(resolved, depth)),
                        Err(reason) => child.reject(cloner.clone_value(reason, depth)),
                    };
                });
                out
            }
            Value::Array(source) => {
                let child = share(Vec::new());
                let out = self.remember(id, Value::Array(child.clone()));
                let items = source.read().clone();
                let cloned: Vec<Value> = items.iter().map(|item| self.clone_value(item, depth)).collect();
                *child.write() = cloned;
                out
            }
            Value::RegExp(source) => {
                let copy = source.read().clone();
                self.remember(id, Value::RegExp(share(copy)))
            }
            Value::Error(source) => {
                // shallow on purpose: the original error stays reachable as prototype
                let child = Object::with_prototype(Some(value.clone()));
                let out = self.remember(id, Value::Error(share(child)));
                self.fill_object(&out, source, depth);
                out
            }
            Value::Object(source) => {
                let prototype = match &self.options.prototype {
                    Some(prototype) => Some(prototype.clone()),
                    None => source.read().prototype().cloned(),
                };
                let out = self.remember(id, Value::from_object(Object::with_prototype(prototype)));
                self.fill_object(&out, source, depth);
                out
            }
            _ => value.clone(),
        }
    }

    fn remember(&mut self, id: usize, clone: Value) -> Value {
        if self.options.circular {
            self.visited.insert(id, clone.clone());
        }
        clone
    }

    /// Copies own properties of `source` onto `target`, best-effort per property.
    fn fill_object(&mut self, target: &Value, source: &Shared<Object>, depth: Option<usize>) {
        let properties = source.read().properties().to_vec();
        for (key, property) in properties {
            match key {
                PropertyKey::Name(_) if property.enumerable => {
                    let copy = self.clone_value(&property.read(), depth);
                    if !target.set_property(key.clone(), copy) {
                        trace!(?key, "Skipping property that is read-only on the clone");
                    }
                }
                PropertyKey::Symbol(_) if property.enumerable => {
                    self.define_copy(target, key, &property, depth);
                }
                _ if self.options.include_non_enumerable => {
                    self.define_copy(target, key, &property, depth);
                }
                _ => {}
            }
        }
    }

    /// Defines a copy of `property` keeping its attributes; accessors keep
    /// their functions.
    fn define_copy(&mut self, target: &Value, key: PropertyKey, property: &Property, depth: Option<usize>) {
        let slot = match &property.slot {
            Slot::Data(value) => Slot::Data(self.clone_value(value, depth)),
            accessor => accessor.clone(),
        };
        if let Some(object) = target.as_object() {
            object.write().define(
                key,
                Property {
                    slot,
                    ..property.clone()
                },
            );
        }
    }
}
