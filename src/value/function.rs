//! Callable values.

use std::fmt;
use std::sync::Arc;

use super::Value;

type Callable = dyn Fn(&[Value]) -> Value + Send + Sync;

/// A shared callable. Cloning a `Function` shares the same closure; the deep
/// clone engine never copies one.
#[derive(Clone)]
pub struct Function(Arc<Callable>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invokes the function.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    /// Reference identity.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[Function]")
    }
}
