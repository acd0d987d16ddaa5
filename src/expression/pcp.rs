use std::cmp::Ordering;

use serde_json::Value;

use super::{EvalError, ExpressionEngine, Host};
use crate::validate::deep_equal;

/// Interpreter for PCP-style programs.
///
/// Evaluation rules:
/// - an array whose first element is a string is a call, `[name, arg...]`
/// - any other array evaluates each element into a list
/// - objects, strings, numbers, booleans and `null` are literals
///
/// `&&`, `||`, `!`, `if` and `'` (quote) see their arguments unevaluated;
/// every other function gets evaluated arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcpEngine;

impl ExpressionEngine for PcpEngine {
    fn execute(&self, program: &str, host: &dyn Host) -> Result<Value, EvalError> {
        let ast: Value =
            serde_json::from_str(program).map_err(|e| EvalError::Parse(e.to_string()))?;
        Interpreter { host }.eval(&ast)
    }
}

struct Interpreter<'h> {
    host: &'h dyn Host,
}

impl Interpreter<'_> {
    fn eval(&self, expr: &Value) -> Result<Value, EvalError> {
        match expr {
            Value::Array(items) => match items.split_first() {
                Some((Value::String(name), args)) => self.call(name, args),
                _ => items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
            },
            literal => Ok(literal.clone()),
        }
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        match name {
            "'" => {
                arity(name, args, 1)?;
                Ok(args[0].clone())
            }
            "getJson" => {
                arity(name, args, 0)?;
                self.host.get_json()
            }
            "if" => {
                arity(name, args, 3)?;
                if self.boolean(name, &args[0])? {
                    self.eval(&args[1])
                } else {
                    self.eval(&args[2])
                }
            }
            "&&" => {
                for arg in args {
                    if !self.boolean(name, arg)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            "||" => {
                for arg in args {
                    if self.boolean(name, arg)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            "!" => {
                arity(name, args, 1)?;
                Ok(Value::Bool(!self.boolean(name, &args[0])?))
            }
            _ => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                apply(name, &values)
            }
        }
    }

    fn boolean(&self, name: &str, expr: &Value) -> Result<bool, EvalError> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(type_error(name, format!("expected a boolean, got {other}"))),
        }
    }
}

fn apply(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match name {
        "prop" => {
            at_least(name, args, 1)?;
            args[1..]
                .iter()
                .try_fold(args[0].clone(), |current, key| prop(name, current, key))
        }
        "==" => {
            arity(name, args, 2)?;
            Ok(Value::Bool(deep_equal(&args[0], &args[1])))
        }
        "!=" => {
            arity(name, args, 2)?;
            Ok(Value::Bool(!deep_equal(&args[0], &args[1])))
        }
        "<" | "<=" | ">" | ">=" => {
            arity(name, args, 2)?;
            let ordering = compare(name, &args[0], &args[1])?;
            Ok(Value::Bool(match name {
                "<" => ordering == Ordering::Less,
                "<=" => ordering != Ordering::Greater,
                ">" => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        "+" => {
            at_least(name, args, 1)?;
            if args.iter().all(Value::is_string) {
                Ok(Value::String(args.iter().filter_map(Value::as_str).collect()))
            } else {
                let sum = numbers(name, args)?.into_iter().sum::<f64>();
                number(name, sum)
            }
        }
        "*" => {
            at_least(name, args, 1)?;
            let product = numbers(name, args)?.into_iter().product::<f64>();
            number(name, product)
        }
        "-" => {
            arity(name, args, 2)?;
            let n = numbers(name, args)?;
            number(name, n[0] - n[1])
        }
        "/" => {
            arity(name, args, 2)?;
            let n = numbers(name, args)?;
            if n[1] == 0.0 {
                return Err(type_error(name, "division by zero"));
            }
            number(name, n[0] / n[1])
        }
        "list" => Ok(Value::Array(args.to_vec())),
        "len" => {
            arity(name, args, 1)?;
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                other => return Err(type_error(name, format!("{other} has no length"))),
            };
            Ok(Value::from(len))
        }
        unknown => Err(EvalError::UnknownFunction(unknown.to_owned())),
    }
}

/// Steps into an object key or array index. Missing entries are `null`.
fn prop(name: &str, current: Value, key: &Value) -> Result<Value, EvalError> {
    let next = match (current, key) {
        (Value::Object(mut map), Value::String(k)) => map.remove(k),
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.into_iter().nth(i)),
        (_, Value::String(_) | Value::Number(_)) => None,
        (_, other) => {
            return Err(type_error(
                name,
                format!("key must be a string or an index, got {other}"),
            ));
        }
    };
    Ok(next.unwrap_or(Value::Null))
}

fn compare(name: &str, a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y)
                .ok_or_else(|| type_error(name, "numbers are not comparable"))
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(type_error(name, format!("cannot compare {a} with {b}"))),
    }
}

fn numbers(name: &str, args: &[Value]) -> Result<Vec<f64>, EvalError> {
    args.iter()
        .map(|arg| {
            arg.as_f64()
                .ok_or_else(|| type_error(name, format!("expected a number, got {arg}")))
        })
        .collect()
}

fn number(name: &str, n: f64) -> Result<Value, EvalError> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Ok(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| type_error(name, "result is not a finite number"))
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::Arity {
            name: name.to_owned(),
            expected: expected.to_string(),
            got: args.len(),
        })
    }
}

fn at_least(name: &str, args: &[Value], min: usize) -> Result<(), EvalError> {
    if args.len() >= min {
        Ok(())
    } else {
        Err(EvalError::Arity {
            name: name.to_owned(),
            expected: format!("at least {min}"),
            got: args.len(),
        })
    }
}

fn type_error(name: &str, message: impl Into<String>) -> EvalError {
    EvalError::Type {
        name: name.to_owned(),
        message: message.into(),
    }
}
