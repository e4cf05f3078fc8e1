use vau_core::{check_arity, Env, Number, Value, VauError};

use crate::register_fn;

fn codepoint_to_char(value: &Value) -> Result<char, VauError> {
    let n = value.as_number().ok_or_else(|| {
        VauError::eval(format!("list->string: all elements must be numbers, got {value}"))
    })?;
    if !n.is_integer() {
        return Err(VauError::eval(format!(
            "list->string: codepoint must be an integer, got {n}"
        )));
    }
    let code = n
        .to_codepoint()
        .ok_or_else(|| VauError::eval(format!("list->string: invalid Unicode codepoint {n}")))?;
    if (0xD800..=0xDFFF).contains(&code) {
        return Err(VauError::eval(format!(
            "list->string: surrogate codepoint {code:#X} is not a character"
        )));
    }
    char::from_u32(code)
        .ok_or_else(|| VauError::eval(format!("list->string: invalid Unicode codepoint {code:#X}")))
}

pub fn register(env: &Env) {
    register_fn(env, "string->list", |_ctx, args| {
        check_arity!(args, "string->list", 1);
        let s = args[0]
            .as_str()
            .ok_or_else(|| VauError::type_error("string->list", "string", args[0].to_string()))?;
        Ok(Value::list(
            s.chars()
                .map(|c| Value::number(Number::from_integer(c as i64)))
                .collect(),
        ))
    });

    register_fn(env, "list->string", |_ctx, args| {
        check_arity!(args, "list->string", 1);
        let items = args[0]
            .to_vec()
            .map_err(|_| VauError::type_error("list->string", "list", args[0].to_string()))?;
        let s = items
            .iter()
            .map(codepoint_to_char)
            .collect::<Result<String, _>>()?;
        Ok(Value::string(&s))
    });
}
