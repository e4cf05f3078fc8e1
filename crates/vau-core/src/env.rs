use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap as SpurMap;
use lasso::Spur;

use crate::error::VauError;
use crate::value::{intern, resolve, Value};

/// One scope frame: local bindings plus an optional parent link.
pub struct EnvFrame {
    pub(crate) bindings: RefCell<SpurMap<Spur, Value>>,
    pub(crate) parent: RefCell<Option<Env>>,
}

impl Drop for EnvFrame {
    fn drop(&mut self) {
        let mut pending: Vec<Value> = self.bindings.get_mut().drain().map(|(_, v)| v).collect();
        if let Some(parent) = self.parent.get_mut().take() {
            pending.push(Value::Environment(parent));
        }
        dismantle(pending);
    }
}

/// Release a batch of values without recursing on the native stack.
///
/// Anything we hold the last strong reference to is taken apart here and
/// its children queued, so long environment chains and long lists are
/// freed in a loop.
pub(crate) fn dismantle(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::Pair(rc) => {
                if let Ok(mut pair) = Rc::try_unwrap(rc) {
                    pending.push(std::mem::replace(&mut pair.head, Value::Nil));
                    pending.push(std::mem::replace(&mut pair.tail, Value::Nil));
                }
            }
            Value::Environment(env) => {
                if let Ok(frame) = Rc::try_unwrap(env.0) {
                    let (bindings, parent) = frame.take_contents();
                    pending.extend(bindings);
                    pending.extend(parent.map(Value::Environment));
                }
            }
            Value::Operative(rc) => {
                if let Ok(op) = Rc::try_unwrap(rc) {
                    pending.push(op.body);
                    pending.push(Value::Environment(op.closure));
                }
            }
            Value::Mutable(rc) => {
                if let Ok(binding) = Rc::try_unwrap(rc) {
                    pending.push(binding.replace(Value::Nil));
                }
            }
            _ => {}
        }
    }
}

impl EnvFrame {
    fn take_contents(&self) -> (Vec<Value>, Option<Env>) {
        let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        let parent = self.parent.borrow_mut().take();
        (bindings.into_values().collect(), parent)
    }
}

/// A shared reference to an environment frame. Cloning shares the frame.
#[derive(Clone)]
pub struct Env(pub(crate) Rc<EnvFrame>);

impl Env {
    /// A frame that is not tracked by any heap; everything outside this
    /// crate allocates through [`crate::Heap::alloc`].
    pub(crate) fn new(parent: Option<Env>) -> Self {
        Env(Rc::new(EnvFrame {
            bindings: RefCell::new(SpurMap::new()),
            parent: RefCell::new(parent),
        }))
    }

    pub fn parent(&self) -> Option<Env> {
        self.0.parent.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Insert or overwrite a binding in this frame only.
    pub fn define(&self, name: Spur, value: Value) {
        self.0.bindings.borrow_mut().insert(name, value);
    }

    pub fn define_str(&self, name: &str, value: Value) {
        self.define(intern(name), value);
    }

    /// The raw bound value, searching outward. A mutable-binding wrapper is
    /// returned as-is.
    pub fn lookup_binding(&self, name: Spur) -> Option<Value> {
        let mut frame = self.clone();
        loop {
            if let Some(value) = frame.0.bindings.borrow().get(&name) {
                return Some(value.clone());
            }
            let parent = frame.0.parent.borrow().clone();
            frame = parent?;
        }
    }

    /// Look a name up, transparently unwrapping mutable bindings.
    pub fn lookup(&self, name: Spur) -> Result<Value, VauError> {
        self.lookup_binding(name)
            .map(Value::unwrap_mutable)
            .ok_or_else(|| VauError::Unbound(resolve(name)))
    }

    pub fn get_str(&self, name: &str) -> Option<Value> {
        self.lookup_binding(intern(name)).map(Value::unwrap_mutable)
    }

    /// Replace the contents of an existing mutable binding.
    pub fn set(&self, name: Spur, value: Value) -> Result<(), VauError> {
        match self.lookup_binding(name) {
            Some(Value::Mutable(binding)) => {
                binding.replace(value);
                Ok(())
            }
            Some(_) => Err(VauError::NotMutable(resolve(name))),
            None => Err(VauError::Unbound(resolve(name))),
        }
    }

    pub fn is_bound_locally(&self, name: Spur) -> bool {
        self.0.bindings.borrow().contains_key(&name)
    }

    pub fn binding_count(&self) -> usize {
        self.0.bindings.borrow().len()
    }

    /// Values bound directly in this frame.
    pub fn local_values(&self) -> Vec<Value> {
        self.0.bindings.borrow().values().cloned().collect()
    }

    /// Drop every binding and the parent link, breaking any cycle through this frame.
    pub(crate) fn sever(&self) {
        let (bindings, parent) = self.0.take_contents();
        let mut pending = bindings;
        pending.extend(parent.map(Value::Environment));
        dismantle(pending);
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<environment:{:#x}>", self.addr())
    }
}
