//! Argument binding and type coercion
//!
//! Pure functions from parameter descriptors to a call plan. The plan
//! says where each argument comes from — a coerced value, the declared
//! default, or a same-named namespace binding — and is materialized
//! inside the sandbox by the call trampoline. Nothing here touches the
//! interpreter.

use std::collections::HashSet;

use serde_json::{Value, json};

use crate::engine::params::{FunctionSpec, ParamKind, TypeTag};

/// Truthy spellings accepted for bool-annotated parameters
const TRUTHY: [&str; 5] = ["true", "1", "yes", "y", "t"];
/// Falsy spellings; the empty string is falsy as well
const FALSY: [&str; 6] = ["false", "0", "no", "n", "f", ""];

/// Where one planned argument comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSource {
    /// A concrete coerced value; `as_tuple` materializes the array as a
    /// tuple at call time
    Value { value: Value, as_tuple: bool },
    /// The parameter's declared default
    Default,
    /// The same-named binding in the executed namespace
    Namespace,
}

/// One argument of the call plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedArg {
    pub name: String,
    pub source: ArgSource,
}

/// Resolved arguments for one entry-point invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallPlan {
    /// Positional arguments, in parameter order
    pub args: Vec<PlannedArg>,
    /// Keyword-only arguments
    pub kwargs: Vec<PlannedArg>,
}

impl CallPlan {
    /// Serialize for the in-sandbox trampoline
    pub fn to_json(&self) -> Value {
        json!({
            "args": self.args.iter().map(planned_to_json).collect::<Vec<_>>(),
            "kwargs": self.kwargs.iter().map(planned_to_json).collect::<Vec<_>>(),
        })
    }
}

fn planned_to_json(arg: &PlannedArg) -> Value {
    match &arg.source {
        ArgSource::Value { value, as_tuple } => json!({
            "name": arg.name,
            "src": "value",
            "value": value,
            "astuple": as_tuple,
        }),
        ArgSource::Default => json!({"name": arg.name, "src": "default"}),
        ArgSource::Namespace => json!({"name": arg.name, "src": "env"}),
    }
}

/// A binding failure. The message is the case's error text, formatted
/// the way the submission runtime would have reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct BindError(pub String);

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bind stdin text to the entry point's positional parameters.
///
/// Zero parameters take no arguments; a single parameter takes the
/// whole (trimmed) stdin text coerced to its declared type; multiple
/// parameters take whitespace tokens positionally, with missing tokens
/// falling back to the declared default, else to coercing the empty
/// string.
pub fn bind_stdin_args(spec: &FunctionSpec, stdin_text: &str) -> Result<CallPlan, BindError> {
    let params: Vec<_> = spec.positional().collect();

    if params.is_empty() {
        return Ok(CallPlan::default());
    }

    if params.len() == 1 {
        let param = params[0];
        let value = coerce(stdin_text.trim(), &param.type_tag).map_err(BindError)?;
        return Ok(CallPlan {
            args: vec![PlannedArg {
                name: param.name.clone(),
                source: value_source(value, &param.type_tag),
            }],
            kwargs: Vec::new(),
        });
    }

    let tokens: Vec<&str> = stdin_text.split_whitespace().collect();
    let mut args = Vec::with_capacity(params.len());
    for (idx, param) in params.iter().enumerate() {
        let source = match tokens.get(idx) {
            Some(token) => {
                let value = coerce(token, &param.type_tag).map_err(BindError)?;
                value_source(value, &param.type_tag)
            }
            None if param.has_default => ArgSource::Default,
            None => {
                let value = coerce("", &param.type_tag).map_err(BindError)?;
                value_source(value, &param.type_tag)
            }
        };
        args.push(PlannedArg {
            name: param.name.clone(),
            source,
        });
    }

    Ok(CallPlan {
        args,
        kwargs: Vec::new(),
    })
}

/// Bind arguments from the executed namespace.
///
/// Each parameter takes the same-named namespace value if present, else
/// its declared default, else the case fails with a missing-argument
/// error. Keyword-only parameters are collected separately.
pub fn bind_data_args(
    spec: &FunctionSpec,
    namespace_keys: &HashSet<String>,
) -> Result<CallPlan, BindError> {
    let mut plan = CallPlan::default();

    for param in &spec.params {
        let source = if namespace_keys.contains(&param.name) {
            ArgSource::Namespace
        } else if param.has_default {
            ArgSource::Default
        } else {
            return Err(BindError(format!(
                "ValueError: Error: missing argument '{}' for '{}'",
                param.name, spec.name
            )));
        };

        let planned = PlannedArg {
            name: param.name.clone(),
            source,
        };
        match param.kind {
            ParamKind::Positional => plan.args.push(planned),
            ParamKind::Keyword => plan.kwargs.push(planned),
        }
    }

    Ok(plan)
}

fn value_source(value: Value, tag: &TypeTag) -> ArgSource {
    ArgSource::Value {
        value,
        as_tuple: matches!(tag, TypeTag::Tuple(_)),
    }
}

/// Coerce one stdin-sourced text to its declared type tag.
///
/// Failures carry the error text the submission runtime would raise for
/// the same conversion.
pub fn coerce(text: &str, tag: &TypeTag) -> Result<Value, String> {
    match tag {
        TypeTag::Text => Ok(Value::String(text.to_string())),
        TypeTag::Int => {
            let raw = text.trim();
            if raw.is_empty() {
                Ok(json!(0))
            } else {
                raw.parse::<i64>().map(|n| json!(n)).map_err(|_| int_error(raw))
            }
        }
        TypeTag::Float => {
            let raw = text.trim();
            if raw.is_empty() {
                return Ok(json!(0.0));
            }
            let parsed = raw.parse::<f64>().map_err(|_| float_error(raw))?;
            serde_json::Number::from_f64(parsed)
                .map(Value::Number)
                .ok_or_else(|| float_error(raw))
        }
        TypeTag::Bool => {
            let raw = text.trim();
            let lowered = raw.to_lowercase();
            if TRUTHY.contains(&lowered.as_str()) {
                Ok(json!(true))
            } else if FALSY.contains(&lowered.as_str()) {
                Ok(json!(false))
            } else {
                // Last resort mirrors bool(int(raw))
                raw.parse::<i64>()
                    .map(|n| json!(n != 0))
                    .map_err(|_| int_error(raw))
            }
        }
        TypeTag::List(inner) | TypeTag::Tuple(inner) => {
            let items = text
                .split_whitespace()
                .map(|token| coerce(token, inner))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(items))
        }
    }
}

fn int_error(raw: &str) -> String {
    format!("ValueError: invalid literal for int() with base 10: '{raw}'")
}

fn float_error(raw: &str) -> String {
    format!("ValueError: could not convert string to float: '{raw}'")
}

#[cfg(test)]
mod tests {
    use crate::engine::params::ParamSpec;

    use super::*;

    fn spec(params: Vec<ParamSpec>) -> FunctionSpec {
        FunctionSpec {
            name: "f".to_string(),
            params,
        }
    }

    fn positional(name: &str, tag: TypeTag, has_default: bool) -> ParamSpec {
        ParamSpec {
            name: name.to_string(),
            kind: ParamKind::Positional,
            type_tag: tag,
            has_default,
        }
    }

    fn keyword(name: &str, tag: TypeTag, has_default: bool) -> ParamSpec {
        ParamSpec {
            name: name.to_string(),
            kind: ParamKind::Keyword,
            type_tag: tag,
            has_default,
        }
    }

    #[test]
    fn coerce_text_passes_through() {
        assert_eq!(coerce("  hi  ", &TypeTag::Text).unwrap(), json!("  hi  "));
    }

    #[test]
    fn coerce_int() {
        assert_eq!(coerce("42", &TypeTag::Int).unwrap(), json!(42));
        assert_eq!(coerce(" -7 ", &TypeTag::Int).unwrap(), json!(-7));
        assert_eq!(coerce("", &TypeTag::Int).unwrap(), json!(0));
        let err = coerce("abc", &TypeTag::Int).unwrap_err();
        assert!(err.contains("invalid literal for int()"));
        assert!(err.contains("'abc'"));
    }

    #[test]
    fn coerce_float() {
        assert_eq!(coerce("1.5", &TypeTag::Float).unwrap(), json!(1.5));
        assert_eq!(coerce("", &TypeTag::Float).unwrap(), json!(0.0));
        assert_eq!(coerce("2", &TypeTag::Float).unwrap(), json!(2.0));
        let err = coerce("x", &TypeTag::Float).unwrap_err();
        assert!(err.contains("could not convert string to float"));
    }

    #[test]
    fn coerce_bool_spellings() {
        for token in ["true", "1", "yes", "Y", "T", "YES"] {
            assert_eq!(coerce(token, &TypeTag::Bool).unwrap(), json!(true), "{token}");
        }
        for token in ["false", "0", "no", "N", "F", ""] {
            assert_eq!(coerce(token, &TypeTag::Bool).unwrap(), json!(false), "{token}");
        }
        // Numeric fallback
        assert_eq!(coerce("2", &TypeTag::Bool).unwrap(), json!(true));
        assert!(coerce("maybe", &TypeTag::Bool).is_err());
    }

    #[test]
    fn coerce_list_of_int() {
        let tag = TypeTag::List(Box::new(TypeTag::Int));
        assert_eq!(coerce("1 2 3", &tag).unwrap(), json!([1, 2, 3]));
        assert_eq!(coerce("", &tag).unwrap(), json!([]));
        assert!(coerce("1 x 3", &tag).is_err());
    }

    #[test]
    fn coerce_tuple_of_float() {
        let tag = TypeTag::Tuple(Box::new(TypeTag::Float));
        assert_eq!(coerce("1.5 2", &tag).unwrap(), json!([1.5, 2.0]));
    }

    #[test]
    fn stdin_zero_params_takes_no_args() {
        let plan = bind_stdin_args(&spec(vec![]), "anything").unwrap();
        assert!(plan.args.is_empty());
        assert!(plan.kwargs.is_empty());
    }

    #[test]
    fn stdin_single_param_takes_whole_text() {
        let plan = bind_stdin_args(
            &spec(vec![positional("line", TypeTag::Text, false)]),
            "  hello world  ",
        )
        .unwrap();
        assert_eq!(plan.args.len(), 1);
        assert_eq!(
            plan.args[0].source,
            ArgSource::Value {
                value: json!("hello world"),
                as_tuple: false
            }
        );
    }

    #[test]
    fn stdin_single_list_param_splits_tokens() {
        let plan = bind_stdin_args(
            &spec(vec![positional(
                "numbers",
                TypeTag::List(Box::new(TypeTag::Int)),
                false,
            )]),
            "1 2 3",
        )
        .unwrap();
        assert_eq!(
            plan.args[0].source,
            ArgSource::Value {
                value: json!([1, 2, 3]),
                as_tuple: false
            }
        );
    }

    #[test]
    fn stdin_multi_params_split_positionally() {
        let plan = bind_stdin_args(
            &spec(vec![
                positional("a", TypeTag::Int, false),
                positional("b", TypeTag::Float, false),
            ]),
            "3 4.5",
        )
        .unwrap();
        assert_eq!(
            plan.args[0].source,
            ArgSource::Value {
                value: json!(3),
                as_tuple: false
            }
        );
        assert_eq!(
            plan.args[1].source,
            ArgSource::Value {
                value: json!(4.5),
                as_tuple: false
            }
        );
    }

    #[test]
    fn stdin_missing_token_uses_default_then_empty() {
        let plan = bind_stdin_args(
            &spec(vec![
                positional("a", TypeTag::Int, false),
                positional("b", TypeTag::Int, true),
                positional("c", TypeTag::Int, false),
            ]),
            "7",
        )
        .unwrap();
        assert_eq!(
            plan.args[0].source,
            ArgSource::Value {
                value: json!(7),
                as_tuple: false
            }
        );
        assert_eq!(plan.args[1].source, ArgSource::Default);
        // No token, no default: coerce the empty string
        assert_eq!(
            plan.args[2].source,
            ArgSource::Value {
                value: json!(0),
                as_tuple: false
            }
        );
    }

    #[test]
    fn stdin_tuple_param_marks_as_tuple() {
        let plan = bind_stdin_args(
            &spec(vec![positional(
                "pair",
                TypeTag::Tuple(Box::new(TypeTag::Int)),
                false,
            )]),
            "1 2",
        )
        .unwrap();
        assert_eq!(
            plan.args[0].source,
            ArgSource::Value {
                value: json!([1, 2]),
                as_tuple: true
            }
        );
    }

    #[test]
    fn stdin_coercion_error_propagates() {
        let err = bind_stdin_args(
            &spec(vec![positional("n", TypeTag::Int, false)]),
            "not-a-number",
        )
        .unwrap_err();
        assert!(err.0.contains("invalid literal"));
    }

    #[test]
    fn data_binds_namespace_then_default() {
        let keys: HashSet<String> = ["numbers".to_string()].into_iter().collect();
        let plan = bind_data_args(
            &spec(vec![
                positional("numbers", TypeTag::Text, false),
                positional("scale", TypeTag::Text, true),
            ]),
            &keys,
        )
        .unwrap();
        assert_eq!(plan.args[0].source, ArgSource::Namespace);
        assert_eq!(plan.args[1].source, ArgSource::Default);
    }

    #[test]
    fn data_missing_required_param_fails() {
        let err = bind_data_args(
            &spec(vec![positional("numbers", TypeTag::Text, false)]),
            &HashSet::new(),
        )
        .unwrap_err();
        assert_eq!(
            err.0,
            "ValueError: Error: missing argument 'numbers' for 'f'"
        );
    }

    #[test]
    fn data_keyword_only_params_collect_separately() {
        let keys: HashSet<String> = ["a".to_string(), "flag".to_string()].into_iter().collect();
        let plan = bind_data_args(
            &spec(vec![
                positional("a", TypeTag::Text, false),
                keyword("flag", TypeTag::Text, false),
            ]),
            &keys,
        )
        .unwrap();
        assert_eq!(plan.args.len(), 1);
        assert_eq!(plan.kwargs.len(), 1);
        assert_eq!(plan.kwargs[0].name, "flag");
        assert_eq!(plan.kwargs[0].source, ArgSource::Namespace);
    }

    #[test]
    fn plan_serializes_for_the_trampoline() {
        let plan = CallPlan {
            args: vec![
                PlannedArg {
                    name: "a".to_string(),
                    source: ArgSource::Value {
                        value: json!([1, 2]),
                        as_tuple: true,
                    },
                },
                PlannedArg {
                    name: "b".to_string(),
                    source: ArgSource::Default,
                },
            ],
            kwargs: vec![PlannedArg {
                name: "c".to_string(),
                source: ArgSource::Namespace,
            }],
        };
        let rendered = plan.to_json();
        assert_eq!(
            rendered,
            json!({
                "args": [
                    {"name": "a", "src": "value", "value": [1, 2], "astuple": true},
                    {"name": "b", "src": "default"},
                ],
                "kwargs": [
                    {"name": "c", "src": "env"},
                ],
            })
        );
    }
}
