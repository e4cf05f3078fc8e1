use vau_core::{check_arity, Env, Value};

use crate::register_fn;

pub fn register(env: &Env) {
    register_fn(env, "write", |ctx, args| {
        check_arity!(args, "write", 1);
        ctx.emit(&args[0].to_string())?;
        Ok(args[0].clone())
    });

    register_fn(env, "display", |ctx, args| {
        check_arity!(args, "display", 1);
        ctx.emit(&args[0].display_string())?;
        Ok(args[0].clone())
    });

    register_fn(env, "read-line", |ctx, args| {
        check_arity!(args, "read-line", 0);
        Ok(match ctx.read_line()? {
            Some(line) => Value::string(&line),
            None => {
                tracing::debug!(target: "vau::builtin", "read-line reached end of input");
                Value::Eos
            }
        })
    });
}
