use std::rc::Rc;

use vau_core::{
    resolve, Env, EvalContext, Operative, ParamPattern, Trampoline, Value, VauError,
};

pub type EvalResult = Result<Value, VauError>;

/// RAII guard that truncates the call stack on drop.
struct CallStackGuard<'a> {
    ctx: &'a EvalContext,
    entry_depth: usize,
}

impl Drop for CallStackGuard<'_> {
    fn drop(&mut self) {
        self.ctx.truncate_call_stack(self.entry_depth);
    }
}

/// Evaluate `expr` in `env`. Tail positions loop here instead of recursing,
/// so the native stack only grows with non-tail nesting.
pub fn eval_value(ctx: &EvalContext, expr: &Value, env: &Env) -> EvalResult {
    match expr {
        Value::Symbol(name) => {
            return env
                .lookup(*name)
                .map_err(|e| e.with_context(resolve(*name), ctx.capture_stack_trace()));
        }
        Value::Pair(_) => {}
        other => return Ok(other.clone()),
    }

    let _guard = CallStackGuard {
        ctx,
        entry_depth: ctx.call_stack_depth(),
    };
    ctx.push_frame(expr.clone());
    let mut current_expr = expr.clone();
    let mut current_env = env.clone();
    let mut _root = ctx.heap.root(env);

    loop {
        tracing::trace!(target: "vau::eval", expr = %current_expr, "eval");
        match eval_step(ctx, &current_expr, &current_env) {
            Ok(Trampoline::Value(v)) => return Ok(v),
            Ok(Trampoline::Eval(next_expr, next_env)) => {
                tracing::trace!(target: "vau::tco", expr = %next_expr, "tail call");
                ctx.replace_frame(next_expr.clone());
                _root = ctx.heap.root(&next_env);
                current_expr = next_expr;
                current_env = next_env;
            }
            Err(e) if e.context().is_some() => return Err(e),
            Err(e) => {
                let stack = ctx.capture_stack_trace();
                return Err(e.with_context(current_expr.to_string(), stack));
            }
        }
    }
}

fn eval_step(ctx: &EvalContext, expr: &Value, env: &Env) -> Result<Trampoline, VauError> {
    match expr {
        Value::Symbol(name) => Ok(Trampoline::Value(env.lookup(*name)?)),
        Value::Pair(pair) => {
            // An operator value already in head position is applied as-is.
            let operator = if pair.head.is_operator() {
                pair.head.clone()
            } else {
                eval_value(ctx, &pair.head, env)?
            };
            apply(ctx, &operator, &pair.tail, env)
        }
        other => Ok(Trampoline::Value(other.clone())),
    }
}

/// Apply an operator to an unevaluated operand list in the caller's environment.
pub fn apply(
    ctx: &EvalContext,
    operator: &Value,
    operands: &Value,
    env: &Env,
) -> Result<Trampoline, VauError> {
    match operator {
        Value::Operative(op) => apply_operative(ctx, op, operands, env),
        Value::Builtin(builtin) => {
            let args = operands.to_vec()?;
            tracing::debug!(
                target: "vau::builtin",
                name = %builtin.name,
                argc = args.len(),
                "invoking builtin"
            );
            (builtin.func)(ctx, &args, env)
        }
        other => Err(VauError::NotOperative(other.to_string())),
    }
}

fn apply_operative(
    ctx: &EvalContext,
    op: &Rc<Operative>,
    operands: &Value,
    env: &Env,
) -> Result<Trampoline, VauError> {
    let frame = ctx.heap.alloc(Some(op.closure.clone()));
    bind_parameters(&op.params, operands, &frame)?;
    if let Some(name) = op.env_param {
        frame.define(name, Value::Environment(env.clone()));
    }
    tracing::debug!(
        target: "vau::operative",
        operands = %operands,
        frame = ?frame,
        "applying operative"
    );
    Ok(Trampoline::Eval(op.body.clone(), frame))
}

/// Bind a parameter pattern against unevaluated operands in `frame`.
pub fn bind_parameters(
    params: &ParamPattern,
    operands: &Value,
    frame: &Env,
) -> Result<(), VauError> {
    match params {
        ParamPattern::Variadic(name) => {
            frame.define(*name, operands.clone());
        }
        ParamPattern::Fixed(names) => {
            let args = operands.to_vec()?;
            if args.len() != names.len() {
                return Err(VauError::OperandCount {
                    expected: names.len(),
                    got: args.len(),
                });
            }
            for (name, arg) in names.iter().zip(args) {
                frame.define(*name, arg);
            }
        }
    }
    Ok(())
}

/// Evaluate every expression in `input`, returning the last value (nil when empty).
pub fn eval_string(ctx: &EvalContext, input: &str, env: &Env) -> EvalResult {
    let exprs = vau_reader::read_many(input)?;
    let mut result = Value::Nil;
    for expr in &exprs {
        result = eval_value(ctx, expr, env)?;
    }
    Ok(result)
}
