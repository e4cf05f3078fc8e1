use vau_core::{check_arity, Env, Value};

use crate::register_fn;

pub fn register(env: &Env) {
    register_fn(env, "cons", |_ctx, args| {
        check_arity!(args, "cons", 2);
        Ok(Value::cons(args[0].clone(), args[1].clone()))
    });

    register_fn(env, "first", |_ctx, args| {
        check_arity!(args, "first", 1);
        args[0].first("first")
    });

    register_fn(env, "rest", |_ctx, args| {
        check_arity!(args, "rest", 1);
        args[0].rest("rest")
    });
}
