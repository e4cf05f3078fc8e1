use std::cmp::Ordering;

use vau_core::{check_arity, Env, Number, Value, VauError};

use crate::register_fn;

fn number_arg<'a>(name: &str, value: &'a Value) -> Result<&'a Number, VauError> {
    value
        .as_number()
        .ok_or_else(|| VauError::type_error(name, "number", value.to_string()))
}

/// Left fold over at least one number; a single operand is returned as-is.
fn fold(
    name: &str,
    args: &[Value],
    op: impl Fn(&Number, &Number) -> Result<Number, VauError>,
) -> Result<Value, VauError> {
    check_arity!(args, name, 1..);
    let mut acc = number_arg(name, &args[0])?.clone();
    for arg in &args[1..] {
        acc = op(&acc, number_arg(name, arg)?)?;
    }
    Ok(Value::number(acc))
}

pub fn register(env: &Env) {
    register_fn(env, "+", |_ctx, args| fold("+", args, |a, b| Ok(a.add(b))));
    register_fn(env, "-", |_ctx, args| fold("-", args, |a, b| Ok(a.sub(b))));
    register_fn(env, "*", |_ctx, args| fold("*", args, |a, b| Ok(a.mul(b))));
    register_fn(env, "/", |_ctx, args| fold("/", args, |a, b| a.div(b)));

    register_fn(env, "<=>", |_ctx, args| {
        check_arity!(args, "<=>", 2);
        let a = number_arg("<=>", &args[0])?;
        let b = number_arg("<=>", &args[1])?;
        Ok(Value::integer(match a.compare(b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }))
    });

    register_fn(env, "numerator", |_ctx, args| {
        check_arity!(args, "numerator", 1);
        Ok(Value::number(number_arg("numerator", &args[0])?.numerator()))
    });

    register_fn(env, "denominator", |_ctx, args| {
        check_arity!(args, "denominator", 1);
        Ok(Value::number(number_arg("denominator", &args[0])?.denominator()))
    });

    register_fn(env, "remainder", |_ctx, args| {
        check_arity!(args, "remainder", 2);
        let a = number_arg("remainder", &args[0])?;
        let b = number_arg("remainder", &args[1])?;
        Ok(Value::number(a.remainder(b)?))
    });
}

#[cfg(test)]
mod tests {
    use crate::testing::{eval, eval_err};

    #[test]
    fn folds_left_to_right() {
        assert_eq!(eval("(+ 1 2 3)").to_string(), "6");
        assert_eq!(eval("(- 10 1 2)").to_string(), "7");
        assert_eq!(eval("(* 2 3 4)").to_string(), "24");
        assert_eq!(eval("(/ 1 3)").to_string(), "0.(3)");
        assert_eq!(eval("(/ 12 2 3)").to_string(), "2");
    }

    #[test]
    fn single_operand_is_returned() {
        assert_eq!(eval("(- 5)").to_string(), "5");
        assert_eq!(eval("(/ 4)").to_string(), "4");
    }

    #[test]
    fn exact_rationals() {
        assert_eq!(eval("(+ 1/3 1/3 1/3)").to_string(), "1");
        assert_eq!(eval("(* 0.5 1/3)").to_string(), "0.1(6)");
    }

    #[test]
    fn no_operands_is_an_arity_error() {
        let err = eval_err("(+)");
        assert_eq!(err.to_string(), "+: expected at least 1 argument, got 0");
    }

    #[test]
    fn non_numbers_are_type_errors() {
        let err = eval_err("(+ 1 \"two\")");
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn division_by_zero() {
        let err = eval_err("(/ 1 0)");
        assert!(err.to_string().contains("division by zero"));
    }

    #[test]
    fn spaceship() {
        assert_eq!(eval("(<=> 1 2)").to_string(), "-1");
        assert_eq!(eval("(<=> 2/4 1/2)").to_string(), "0");
        assert_eq!(eval("(<=> 3 2)").to_string(), "1");
    }

    #[test]
    fn numerator_denominator_remainder() {
        assert_eq!(eval("(numerator 6/4)").to_string(), "3");
        assert_eq!(eval("(denominator 6/4)").to_string(), "2");
        assert_eq!(eval("(remainder -7 3)").to_string(), "-1");
    }
}
