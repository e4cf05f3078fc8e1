use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::{Env, Heap, StackTrace, Value, VauError};

/// Evaluates one expression to a value. Installed by the evaluator crate so
/// builtins defined elsewhere can evaluate their operands.
pub type EvalFn = fn(&EvalContext, &Value, &Env) -> Result<Value, VauError>;

/// Per-interpreter runtime state: the environment heap, the in-flight
/// expression stack and the I/O endpoints used by builtins.
pub struct EvalContext {
    pub heap: Heap,
    call_stack: RefCell<Vec<Value>>,
    max_depth: Cell<usize>,
    eval_fn: Cell<Option<EvalFn>>,
    booleans: RefCell<Option<(Value, Value)>>,
    captured_output: RefCell<Option<String>>,
    scripted_input: RefCell<Option<VecDeque<String>>>,
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext {
            heap: Heap::new(),
            call_stack: RefCell::new(Vec::new()),
            max_depth: Cell::new(0),
            eval_fn: Cell::new(None),
            booleans: RefCell::new(None),
            captured_output: RefCell::new(None),
            scripted_input: RefCell::new(None),
        }
    }

    pub fn set_eval_fn(&self, f: EvalFn) {
        self.eval_fn.set(Some(f));
    }

    pub fn eval(&self, expr: &Value, env: &Env) -> Result<Value, VauError> {
        match self.eval_fn.get() {
            Some(f) => f(self, expr, env),
            None => Err(VauError::eval("no evaluator installed")),
        }
    }

    // -- call stack --------------------------------------------------------

    pub fn push_frame(&self, expr: Value) {
        let mut stack = self.call_stack.borrow_mut();
        stack.push(expr);
        if stack.len() > self.max_depth.get() {
            self.max_depth.set(stack.len());
        }
    }

    /// Swap the innermost in-flight expression for a tail call's.
    pub fn replace_frame(&self, expr: Value) {
        if let Some(top) = self.call_stack.borrow_mut().last_mut() {
            *top = expr;
        }
    }

    pub fn truncate_call_stack(&self, depth: usize) {
        self.call_stack.borrow_mut().truncate(depth);
    }

    pub fn call_stack_depth(&self) -> usize {
        self.call_stack.borrow().len()
    }

    pub fn max_call_stack_depth(&self) -> usize {
        self.max_depth.get()
    }

    pub fn reset_max_call_stack_depth(&self) {
        self.max_depth.set(self.call_stack_depth());
    }

    /// Render the in-flight expressions, outermost first.
    pub fn capture_stack_trace(&self) -> StackTrace {
        StackTrace(
            self.call_stack
                .borrow()
                .iter()
                .map(|expr| expr.to_string())
                .collect(),
        )
    }

    // -- Church booleans ---------------------------------------------------

    pub fn set_booleans(&self, true_op: Value, false_op: Value) {
        *self.booleans.borrow_mut() = Some((true_op, false_op));
    }

    pub fn boolean(&self, b: bool) -> Result<Value, VauError> {
        match &*self.booleans.borrow() {
            Some((t, f)) => Ok(if b { t.clone() } else { f.clone() }),
            None => Err(VauError::eval("booleans are not installed")),
        }
    }

    pub fn clear_booleans(&self) {
        self.booleans.borrow_mut().take();
    }

    // -- I/O ---------------------------------------------------------------

    /// Route `write`/`display` output into a buffer instead of stdout.
    pub fn capture_output(&self) {
        *self.captured_output.borrow_mut() = Some(String::new());
    }

    /// Take everything captured so far, leaving capture enabled.
    pub fn take_output(&self) -> String {
        self.captured_output
            .borrow_mut()
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub fn emit(&self, text: &str) -> Result<(), VauError> {
        if let Some(buf) = self.captured_output.borrow_mut().as_mut() {
            buf.push_str(text);
            return Ok(());
        }
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(text.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| VauError::Io(e.to_string()))
    }

    /// Feed `read-line` from the given text instead of stdin.
    pub fn script_input(&self, text: &str) {
        *self.scripted_input.borrow_mut() = Some(text.lines().map(str::to_string).collect());
    }

    /// Next line of input without its terminator, or `None` at end of input.
    pub fn read_line(&self) -> Result<Option<String>, VauError> {
        if let Some(lines) = self.scripted_input.borrow_mut().as_mut() {
            return Ok(lines.pop_front());
        }
        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| VauError::Io(e.to_string()))?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}
