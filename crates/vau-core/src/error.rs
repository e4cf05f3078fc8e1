use std::fmt;

/// Check arity of a builtin's operands, returning `VauError::Arity` on mismatch.
///
/// # Forms
///
/// ```ignore
/// check_arity!(args, "fn-name", 2);        // exactly 2
/// check_arity!(args, "fn-name", 1..=3);    // 1 to 3 inclusive
/// check_arity!(args, "fn-name", 1..);      // 1 or more
/// ```
#[macro_export]
macro_rules! check_arity {
    ($args:expr, $name:expr, $exact:literal) => {
        if $args.len() != $exact {
            return Err($crate::VauError::arity(
                $name,
                stringify!($exact),
                $args.len(),
            ));
        }
    };
    ($args:expr, $name:expr, $lo:literal ..= $hi:literal) => {
        if $args.len() < $lo || $args.len() > $hi {
            return Err($crate::VauError::arity(
                $name,
                concat!(stringify!($lo), " or ", stringify!($hi)),
                $args.len(),
            ));
        }
    };
    ($args:expr, $name:expr, $lo:literal ..) => {
        if $args.len() < $lo {
            return Err($crate::VauError::arity(
                $name,
                concat!("at least ", stringify!($lo)),
                $args.len(),
            ));
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(line: usize, col: usize) -> Self {
        Span { line, col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The in-flight expression stack captured when an error was raised,
/// outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackTrace(pub Vec<String>);

impl StackTrace {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, expr) in self.0.iter().enumerate() {
            writeln!(f, "{index}: {expr}")?;
        }
        Ok(())
    }
}

/// "argument" after a count of exactly one, "arguments" otherwise.
fn argument_noun(expected: &str) -> &'static str {
    match expected.rsplit(' ').next() {
        Some("1") => "argument",
        _ => "arguments",
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum VauError {
    #[error("Reader error at {span}: {message}")]
    Reader { message: String, span: Span },

    #[error("{0}")]
    Eval(String),

    #[error("{name}: expected {expected}, got {got}")]
    Type {
        name: String,
        expected: String,
        got: String,
    },

    #[error("{name}: expected {expected} {}, got {got}", argument_noun(.expected))]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("wrong number of arguments: expected {expected}, got {got}")]
    OperandCount { expected: usize, got: usize },

    #[error("Unbound variable: {0}")]
    Unbound(String),

    #[error("set!: variable '{0}' is not mutable (use define-mutable)")]
    NotMutable(String),

    #[error("Not an operative: {0}")]
    NotOperative(String),

    #[error("{0}: not a pair")]
    NotAPair(String),

    #[error("Improper list")]
    ImproperList,

    #[error("IO error: {0}")]
    Io(String),

    #[error("{inner}\n  while evaluating: {context}")]
    WithContext {
        inner: Box<VauError>,
        context: String,
        stack: StackTrace,
    },
}

impl VauError {
    pub fn eval(msg: impl Into<String>) -> Self {
        VauError::Eval(msg.into())
    }

    pub fn type_error(
        name: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        VauError::Type {
            name: name.into(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn arity(name: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        VauError::Arity {
            name: name.into(),
            expected: expected.into(),
            got,
        }
    }

    pub fn reader(message: impl Into<String>, span: Span) -> Self {
        VauError::Reader {
            message: message.into(),
            span,
        }
    }

    /// Attach the expression being evaluated and the in-flight stack.
    /// The innermost frame wins: an error that already has context is returned unchanged.
    pub fn with_context(self, context: impl Into<String>, stack: StackTrace) -> Self {
        match self {
            VauError::WithContext { .. } => self,
            other => VauError::WithContext {
                inner: Box::new(other),
                context: context.into(),
                stack,
            },
        }
    }

    pub fn context(&self) -> Option<&str> {
        match self {
            VauError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn stack_trace(&self) -> Option<&StackTrace> {
        match self {
            VauError::WithContext { stack, .. } if !stack.is_empty() => Some(stack),
            _ => None,
        }
    }

    pub fn inner(&self) -> &VauError {
        match self {
            VauError::WithContext { inner, .. } => inner.inner(),
            other => other,
        }
    }

    /// The human-readable message without the context suffix.
    pub fn message(&self) -> String {
        self.inner().to_string()
    }
}
