use vau_core::{check_arity, Env, Value};

use crate::register_fn;

pub fn register(env: &Env) {
    register_fn(env, "=", |ctx, args| {
        check_arity!(args, "=", 2);
        ctx.boolean(args[0] == args[1])
    });

    register_fn(env, "nil?", |ctx, args| {
        check_arity!(args, "nil?", 1);
        ctx.boolean(args[0].is_nil())
    });

    register_fn(env, "eof?", |ctx, args| {
        check_arity!(args, "eof?", 1);
        ctx.boolean(matches!(args[0], Value::Eos))
    });
}
