use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use lasso::{Rodeo, Spur};

use crate::context::EvalContext;
use crate::env::{dismantle, Env};
use crate::error::VauError;
use crate::number::Number;

thread_local! {
    static INTERNER: RefCell<Rodeo> = RefCell::new(Rodeo::default());
}

/// Intern a string, returning a Spur key.
pub fn intern(s: &str) -> Spur {
    INTERNER.with(|r| r.borrow_mut().get_or_intern(s))
}

/// Resolve a Spur key back to a String.
pub fn resolve(spur: Spur) -> String {
    INTERNER.with(|r| r.borrow().resolve(&spur).to_string())
}

/// Resolve a Spur and call f with the &str, avoiding allocation.
pub fn with_resolved<F, R>(spur: Spur, f: F) -> R
where
    F: FnOnce(&str) -> R,
{
    INTERNER.with(|r| {
        let interner = r.borrow();
        f(interner.resolve(&spur))
    })
}

/// What a builtin hands back to the evaluator: either a finished value or an
/// expression to continue with in tail position.
pub enum Trampoline {
    Value(Value),
    Eval(Value, Env),
}

/// A host function. It receives the unevaluated operands and the caller's
/// environment and decides for itself what to evaluate.
pub type BuiltinFn = dyn Fn(&EvalContext, &[Value], &Env) -> Result<Trampoline, VauError>;

pub struct BuiltinOperative {
    pub name: String,
    pub func: Box<BuiltinFn>,
}

impl BuiltinOperative {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&EvalContext, &[Value], &Env) -> Result<Trampoline, VauError> + 'static,
    ) -> Self {
        BuiltinOperative {
            name: name.into(),
            func: Box::new(f),
        }
    }
}

impl fmt::Debug for BuiltinOperative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<builtin-operative:{}>", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamPattern {
    /// One name bound to the whole operand list.
    Variadic(Spur),
    /// Names bound positionally; the operand count must match.
    Fixed(Vec<Spur>),
}

/// A user-defined operative created by `vau`.
pub struct Operative {
    pub params: ParamPattern,
    pub env_param: Option<Spur>,
    pub body: Value,
    pub closure: Env,
    /// Display/equality tag for interpreter-provided operatives such as `true`.
    pub tag: Option<String>,
}

pub struct Pair {
    pub head: Value,
    pub tail: Value,
}

impl Drop for Pair {
    fn drop(&mut self) {
        if self.tail.owns_graph() || self.head.owns_graph() {
            let head = std::mem::replace(&mut self.head, Value::Nil);
            let tail = std::mem::replace(&mut self.tail, Value::Nil);
            dismantle(vec![head, tail]);
        }
    }
}

/// The bound value of a name declared with `define-mutable`.
pub struct MutableBinding {
    value: RefCell<Value>,
}

impl MutableBinding {
    pub fn new(value: Value) -> Self {
        MutableBinding {
            value: RefCell::new(value),
        }
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn replace(&self, value: Value) -> Value {
        self.value.replace(value)
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Number(Rc<Number>),
    String(Rc<String>),
    Symbol(Spur),
    Pair(Rc<Pair>),
    Operative(Rc<Operative>),
    Builtin(Rc<BuiltinOperative>),
    Environment(Env),
    Mutable(Rc<MutableBinding>),
    /// End of stream, returned by `read-line` at end of input.
    Eos,
}

impl Value {
    pub fn number(n: Number) -> Value {
        Value::Number(Rc::new(n))
    }

    pub fn integer(n: i64) -> Value {
        Value::Number(Rc::new(Number::from_integer(n)))
    }

    pub fn string(s: &str) -> Value {
        Value::String(Rc::new(s.to_string()))
    }

    pub fn symbol(s: &str) -> Value {
        Value::Symbol(intern(s))
    }

    pub fn cons(head: Value, tail: Value) -> Value {
        Value::Pair(Rc::new(Pair { head, tail }))
    }

    /// Build a proper, nil-terminated list.
    pub fn list(items: Vec<Value>) -> Value {
        items
            .into_iter()
            .rev()
            .fold(Value::Nil, |tail, head| Value::cons(head, tail))
    }

    pub fn builtin(
        name: impl Into<String>,
        f: impl Fn(&EvalContext, &[Value], &Env) -> Result<Trampoline, VauError> + 'static,
    ) -> Value {
        Value::Builtin(Rc::new(BuiltinOperative::new(name, f)))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Value::Operative(_) | Value::Builtin(_))
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_symbol_spur(&self) -> Option<Spur> {
        match self {
            Value::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_env(&self) -> Option<&Env> {
        match self {
            Value::Environment(e) => Some(e),
            _ => None,
        }
    }

    /// Car. `who` names the operation for the error message.
    pub fn first(&self, who: &str) -> Result<Value, VauError> {
        match self {
            Value::Pair(p) => Ok(p.head.clone()),
            _ => Err(VauError::NotAPair(who.to_string())),
        }
    }

    /// Cdr. `who` names the operation for the error message.
    pub fn rest(&self, who: &str) -> Result<Value, VauError> {
        match self {
            Value::Pair(p) => Ok(p.tail.clone()),
            _ => Err(VauError::NotAPair(who.to_string())),
        }
    }

    /// Collect a proper list into a vector; anything not ending in nil is an error.
    pub fn to_vec(&self) -> Result<Vec<Value>, VauError> {
        let mut items = Vec::new();
        let mut cursor = self;
        loop {
            match cursor {
                Value::Nil => return Ok(items),
                Value::Pair(p) => {
                    items.push(p.head.clone());
                    cursor = &p.tail;
                }
                _ => return Err(VauError::ImproperList),
            }
        }
    }

    /// Strip a mutable-binding wrapper, if any.
    pub fn unwrap_mutable(self) -> Value {
        match self {
            Value::Mutable(m) => m.get(),
            other => other,
        }
    }

    /// Whether dropping this value may cascade into further shared structure.
    pub(crate) fn owns_graph(&self) -> bool {
        matches!(
            self,
            Value::Pair(_) | Value::Operative(_) | Value::Environment(_) | Value::Mutable(_)
        )
    }

    /// The `display` rendering: strings without quotes or escapes.
    pub fn display_string(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        // Walk list spines iteratively; heads recurse.
        loop {
            match (a, b) {
                (Value::Pair(x), Value::Pair(y)) => {
                    if Rc::ptr_eq(x, y) {
                        return true;
                    }
                    if x.head != y.head {
                        return false;
                    }
                    a = &x.tail;
                    b = &y.tail;
                }
                _ => return atom_eq(a, b),
            }
        }
    }
}

fn atom_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) | (Value::Eos, Value::Eos) => true,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Operative(x), Value::Operative(y)) => match (&x.tag, &y.tag) {
            (Some(tx), Some(ty)) => tx == ty,
            _ => Rc::ptr_eq(x, y),
        },
        (Value::Builtin(x), Value::Builtin(y)) => Rc::ptr_eq(x, y),
        (Value::Environment(x), Value::Environment(y)) => x.ptr_eq(y),
        (Value::Mutable(x), Value::Mutable(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\x1b' => write!(f, "\\e")?,
            _ => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "()"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write_string_literal(f, s),
            Value::Symbol(s) => with_resolved(*s, |name| write!(f, "{name}")),
            Value::Pair(p) => {
                write!(f, "({}", p.head)?;
                let mut tail = &p.tail;
                loop {
                    match tail {
                        Value::Nil => break,
                        Value::Pair(next) => {
                            write!(f, " {}", next.head)?;
                            tail = &next.tail;
                        }
                        other => {
                            write!(f, " . {other}")?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::Operative(op) => {
                if let Some(tag) = &op.tag {
                    return write!(f, "{tag}");
                }
                write!(f, "(operative ")?;
                match &op.params {
                    ParamPattern::Variadic(name) => with_resolved(*name, |n| write!(f, "{n}"))?,
                    ParamPattern::Fixed(names) => {
                        write!(f, "(")?;
                        for (i, name) in names.iter().enumerate() {
                            if i > 0 {
                                write!(f, " ")?;
                            }
                            with_resolved(*name, |n| write!(f, "{n}"))?;
                        }
                        write!(f, ")")?;
                    }
                }
                match op.env_param {
                    Some(name) => with_resolved(name, |n| write!(f, " {n}"))?,
                    None => write!(f, " ()")?,
                }
                write!(f, " {})", op.body)
            }
            Value::Builtin(b) => write!(f, "#<builtin-operative:{}>", b.name),
            Value::Environment(env) => write!(f, "{env:?}"),
            Value::Mutable(m) => write!(f, "#<mutable:{}>", m.get()),
            Value::Eos => write!(f, "#<eos>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
