pub mod context;
pub mod env;
pub mod error;
pub mod heap;
pub mod number;
pub mod value;

pub use context::{EvalContext, EvalFn};
pub use env::Env;
pub use error::{Span, StackTrace, VauError};
pub use heap::{CollectStats, EnvRoot, Heap};
pub use lasso::Spur;
pub use number::Number;
pub use value::{
    intern, resolve, with_resolved, BuiltinFn, BuiltinOperative, MutableBinding, Operative, Pair,
    ParamPattern, Trampoline, Value,
};
