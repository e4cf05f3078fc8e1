mod arithmetic;
mod io;
mod list;
mod predicates;
mod string;

use vau_core::{Env, EvalContext, Trampoline, Value, VauError};

/// Bind every non-control builtin in `env`.
pub fn register_stdlib(env: &Env) {
    arithmetic::register(env);
    list::register(env);
    predicates::register(env);
    io::register(env);
    string::register(env);
}

/// Register a builtin that evaluates all of its operands, left to right, in
/// the caller's environment before `f` sees them.
fn register_fn(
    env: &Env,
    name: &str,
    f: impl Fn(&EvalContext, &[Value]) -> Result<Value, VauError> + 'static,
) {
    env.define_str(
        name,
        Value::builtin(name, move |ctx, operands, caller| {
            let args = operands
                .iter()
                .map(|operand| ctx.eval(operand, caller))
                .collect::<Result<Vec<_>, _>>()?;
            f(ctx, &args).map(Trampoline::Value)
        }),
    );
}
