use std::rc::Rc;

use vau_core::{
    check_arity, intern, Env, EvalContext, MutableBinding, Operative, ParamPattern, Spur,
    Trampoline, Value, VauError,
};

use crate::eval::eval_value;

type ControlFn = fn(&EvalContext, &[Value], &Env) -> Result<Trampoline, VauError>;

fn register(env: &Env, name: &str, f: ControlFn) {
    env.define_str(name, Value::builtin(name, f));
}

pub fn register_control(env: &Env) {
    register(env, "vau", eval_vau);
    register(env, "eval", eval_eval);
    register(env, "define", eval_define);
    register(env, "define-mutable", eval_define_mutable);
    register(env, "set!", eval_set);
    register(env, "invoke", eval_invoke);
    register(env, "do", eval_do);
    register(env, "try", eval_try);
    register(env, "q", eval_quote);
}

/// Build the Church booleans over `env` and bind them as `true` and `false`.
pub fn install_booleans(ctx: &EvalContext, env: &Env) {
    let make = |tag: &str, chosen: &str| {
        let body = Value::list(vec![
            Value::symbol("eval"),
            Value::symbol(chosen),
            Value::symbol("env"),
        ]);
        Value::Operative(Rc::new(Operative {
            params: ParamPattern::Fixed(vec![intern("x"), intern("y")]),
            env_param: Some(intern("env")),
            body,
            closure: env.clone(),
            tag: Some(tag.to_string()),
        }))
    };
    let true_op = make("true", "x");
    let false_op = make("false", "y");
    env.define_str("true", true_op.clone());
    env.define_str("false", false_op.clone());
    ctx.set_booleans(true_op, false_op);
}

fn symbol_operand(form: &str, value: &Value) -> Result<Spur, VauError> {
    value.as_symbol_spur().ok_or_else(|| {
        VauError::eval(format!("{form}: first argument must be a symbol, got {value}"))
    })
}

fn parse_params(params: &Value) -> Result<ParamPattern, VauError> {
    if let Some(name) = params.as_symbol_spur() {
        return Ok(ParamPattern::Variadic(name));
    }
    let items = params.to_vec().map_err(|_| {
        VauError::eval(format!(
            "vau: parameters must be a symbol or a list of symbols, got {params}"
        ))
    })?;
    let names = items
        .iter()
        .map(|p| {
            p.as_symbol_spur()
                .ok_or_else(|| VauError::eval(format!("vau: parameter must be a symbol, got {p}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParamPattern::Fixed(names))
}

/// `(vau params env-param body)`: nothing is evaluated.
fn eval_vau(_ctx: &EvalContext, args: &[Value], env: &Env) -> Result<Trampoline, VauError> {
    check_arity!(args, "vau", 3);
    let params = parse_params(&args[0])?;
    let env_param = match &args[1] {
        Value::Nil => None,
        Value::Symbol(name) => Some(*name),
        other => {
            return Err(VauError::eval(format!(
                "vau: environment parameter must be a symbol or (), got {other}"
            )))
        }
    };
    Ok(Trampoline::Value(Value::Operative(Rc::new(Operative {
        params,
        env_param,
        body: args[2].clone(),
        closure: env.clone(),
        tag: None,
    }))))
}

/// `(eval expr env-expr)`: both operands are evaluated in the caller's
/// environment, then the first result is evaluated in the second.
fn eval_eval(ctx: &EvalContext, args: &[Value], env: &Env) -> Result<Trampoline, VauError> {
    check_arity!(args, "eval", 2);
    let expr = eval_value(ctx, &args[0], env)?;
    let target = eval_value(ctx, &args[1], env)?;
    match target {
        Value::Environment(target) => Ok(Trampoline::Eval(expr, target)),
        other => Err(VauError::type_error("eval", "environment", other.to_string())),
    }
}

fn eval_define(ctx: &EvalContext, args: &[Value], env: &Env) -> Result<Trampoline, VauError> {
    check_arity!(args, "define", 2);
    let name = symbol_operand("define", &args[0])?;
    let value = eval_value(ctx, &args[1], env)?;
    env.define(name, value.clone());
    Ok(Trampoline::Value(value))
}

fn eval_define_mutable(
    ctx: &EvalContext,
    args: &[Value],
    env: &Env,
) -> Result<Trampoline, VauError> {
    check_arity!(args, "define-mutable", 2);
    let name = symbol_operand("define-mutable", &args[0])?;
    let value = eval_value(ctx, &args[1], env)?;
    env.define(name, Value::Mutable(Rc::new(MutableBinding::new(value.clone()))));
    Ok(Trampoline::Value(value))
}

fn eval_set(ctx: &EvalContext, args: &[Value], env: &Env) -> Result<Trampoline, VauError> {
    check_arity!(args, "set!", 2);
    let name = symbol_operand("set!", &args[0])?;
    let value = eval_value(ctx, &args[1], env)?;
    env.set(name, value.clone())?;
    Ok(Trampoline::Value(value))
}

/// `(invoke operator list-expr)`: evaluates the list, then calls
/// `(operator . list)` in tail position.
fn eval_invoke(ctx: &EvalContext, args: &[Value], env: &Env) -> Result<Trampoline, VauError> {
    check_arity!(args, "invoke", 2);
    let operands = eval_value(ctx, &args[1], env)?;
    if operands.to_vec().is_err() {
        return Err(VauError::type_error("invoke", "list", operands.to_string()));
    }
    Ok(Trampoline::Eval(
        Value::cons(args[0].clone(), operands),
        env.clone(),
    ))
}

fn eval_do(ctx: &EvalContext, args: &[Value], env: &Env) -> Result<Trampoline, VauError> {
    let Some((last, init)) = args.split_last() else {
        return Ok(Trampoline::Value(Value::Nil));
    };
    for expr in init {
        eval_value(ctx, expr, env)?;
    }
    Ok(Trampoline::Eval(last.clone(), env.clone()))
}

fn eval_quote(_ctx: &EvalContext, args: &[Value], _env: &Env) -> Result<Trampoline, VauError> {
    check_arity!(args, "q", 1);
    Ok(Trampoline::Value(args[0].clone()))
}

/// `(q value)` with the quoting builtin itself in head position, so the
/// handler sees the value no matter what `q` is bound to.
fn quoted(value: Value) -> Value {
    Value::list(vec![Value::builtin("q", eval_quote), value])
}

/// `(error message context stack)` as handed to a `try` handler.
fn error_to_value(err: &VauError) -> Value {
    Value::list(vec![
        Value::symbol("error"),
        Value::string(&err.message()),
        Value::string(err.context().unwrap_or_default()),
        Value::string(&err.stack_trace().map(|s| s.to_string()).unwrap_or_default()),
    ])
}

/// `(try expr handler [finally])`.
fn eval_try(ctx: &EvalContext, args: &[Value], env: &Env) -> Result<Trampoline, VauError> {
    check_arity!(args, "try", 2..=3);

    let result = match eval_value(ctx, &args[0], env) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(target: "vau::eval", error = %err.message(), "try caught error");
            let call = Value::list(vec![args[1].clone(), quoted(error_to_value(&err))]);
            if args.len() == 2 {
                return Ok(Trampoline::Eval(call, env.clone()));
            }
            eval_value(ctx, &call, env)?
        }
    };

    match args.get(2) {
        Some(finally) => Ok(Trampoline::Eval(
            Value::list(vec![finally.clone(), quoted(result)]),
            env.clone(),
        )),
        None => Ok(Trampoline::Value(result)),
    }
}
