use skjema_data::DataModelReference;

use crate::ast::Expr;
use crate::ast::ExprFunction;
use crate::error::ExprError;
use crate::sources::AuthContextKey;
use crate::sources::ExprContext;
use crate::sources::InstanceContextKey;
use crate::value::ExprValue;

/// Evaluates an expression depth-first against the context's data-source
/// snapshot. Pure: no side effects, safe to call repeatedly and to
/// memoize on the snapshot identity.
///
/// Arguments are evaluated before their operator is applied, except for
/// the designed short-circuit operators: `and`/`or` stop left-to-right at
/// the first decisive operand, and `if` only evaluates the taken branch.
pub fn evaluate(expr: &Expr, ctx: &ExprContext<'_>) -> Result<ExprValue, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Call { func, args } => apply(*func, args, ctx),
    }
}

/// Boundary entry point for rendering: a failed evaluation must never
/// crash a page, so this logs the error and falls back to the caller's
/// type-appropriate default.
pub fn evaluate_with_default(expr: &Expr, ctx: &ExprContext<'_>, default: ExprValue) -> ExprValue {
    match evaluate(expr, ctx) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "expression evaluation failed, using default");
            default
        }
    }
}

fn apply(func: ExprFunction, args: &[Expr], ctx: &ExprContext<'_>) -> Result<ExprValue, ExprError> {
    match func {
        ExprFunction::And => {
            for arg in args {
                if !truthy(arg, ctx)? {
                    return Ok(ExprValue::Bool(false));
                }
            }
            Ok(ExprValue::Bool(true))
        }
        ExprFunction::Or => {
            for arg in args {
                if truthy(arg, ctx)? {
                    return Ok(ExprValue::Bool(true));
                }
            }
            Ok(ExprValue::Bool(false))
        }
        ExprFunction::Not => Ok(ExprValue::Bool(!truthy(&args[0], ctx)?)),
        ExprFunction::If => {
            if truthy(&args[0], ctx)? {
                evaluate(&args[1], ctx)
            } else if args.len() == 4 {
                evaluate(&args[3], ctx)
            } else {
                Ok(ExprValue::Null)
            }
        }
        ExprFunction::Equals => {
            let (a, b) = eval_pair(args, ctx)?;
            Ok(ExprValue::Bool(a.as_string() == b.as_string()))
        }
        ExprFunction::NotEquals => {
            let (a, b) = eval_pair(args, ctx)?;
            Ok(ExprValue::Bool(a.as_string() != b.as_string()))
        }
        ExprFunction::GreaterThan => compare(args, ctx, |a, b| a > b),
        ExprFunction::GreaterThanEq => compare(args, ctx, |a, b| a >= b),
        ExprFunction::LessThan => compare(args, ctx, |a, b| a < b),
        ExprFunction::LessThanEq => compare(args, ctx, |a, b| a <= b),
        ExprFunction::Concat => {
            let mut out = String::new();
            for arg in args {
                if let Some(part) = evaluate(arg, ctx)?.as_string() {
                    out.push_str(&part);
                }
            }
            Ok(ExprValue::String(out))
        }
        ExprFunction::Contains => {
            let (a, b) = eval_strings(args, ctx)?;
            Ok(ExprValue::Bool(match (a, b) {
                (Some(haystack), Some(needle)) => haystack.contains(&needle),
                _ => false,
            }))
        }
        ExprFunction::NotContains => {
            let (a, b) = eval_strings(args, ctx)?;
            Ok(ExprValue::Bool(match (a, b) {
                (Some(haystack), Some(needle)) => !haystack.contains(&needle),
                _ => true,
            }))
        }
        ExprFunction::StartsWith => {
            let (a, b) = eval_strings(args, ctx)?;
            Ok(ExprValue::Bool(matches!(
                (a, b),
                (Some(s), Some(prefix)) if s.starts_with(&prefix)
            )))
        }
        ExprFunction::EndsWith => {
            let (a, b) = eval_strings(args, ctx)?;
            Ok(ExprValue::Bool(matches!(
                (a, b),
                (Some(s), Some(suffix)) if s.ends_with(&suffix)
            )))
        }
        ExprFunction::StringLength => {
            let value = evaluate(&args[0], ctx)?.as_string();
            #[allow(clippy::cast_precision_loss)]
            Ok(ExprValue::Number(
                value.map_or(0, |s| s.chars().count()) as f64,
            ))
        }
        ExprFunction::CommaContains => {
            let (a, b) = eval_strings(args, ctx)?;
            Ok(ExprValue::Bool(match (a, b) {
                (Some(list), Some(needle)) => list.split(',').map(str::trim).any(|p| p == needle),
                _ => false,
            }))
        }
        ExprFunction::LowerCase => Ok(map_string(evaluate(&args[0], ctx)?, str::to_lowercase)),
        ExprFunction::UpperCase => Ok(map_string(evaluate(&args[0], ctx)?, str::to_uppercase)),
        ExprFunction::Round => {
            let number = evaluate(&args[0], ctx)?.as_number()?.unwrap_or(0.0);
            let decimals = match args.get(1) {
                Some(arg) => to_index(evaluate(arg, ctx)?.as_number()?.unwrap_or(0.0)),
                None => 0,
            };
            Ok(ExprValue::String(format!("{number:.decimals$}")))
        }
        ExprFunction::DataModel => data_model(args, ctx),
        ExprFunction::Component => {
            let id = require_string(&args[0], ctx, "component")?;
            match ctx.sources.component_value(ctx.node, &id) {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Ok(ExprValue::Null),
                Err(_) => Err(ExprError::ComponentNotFound { id }),
            }
        }
        ExprFunction::DisplayValue => {
            let id = require_string(&args[0], ctx, "displayValue")?;
            match ctx.sources.display_value(ctx.node, &id) {
                Ok(Some(value)) => Ok(ExprValue::String(value)),
                Ok(None) => Ok(ExprValue::Null),
                Err(_) => Err(ExprError::ComponentNotFound { id }),
            }
        }
        ExprFunction::InstanceContext => {
            let name = require_string(&args[0], ctx, "instanceContext")?;
            let key = InstanceContextKey::from_name(&name)
                .ok_or(ExprError::UnknownInstanceContextKey(name))?;
            Ok(ctx
                .sources
                .instance_context(key)
                .map_or(ExprValue::Null, ExprValue::String))
        }
        ExprFunction::AuthContext => {
            let name = require_string(&args[0], ctx, "authContext")?;
            let key =
                AuthContextKey::from_name(&name).ok_or(ExprError::UnknownAuthContextKey(name))?;
            Ok(ExprValue::Bool(ctx.sources.auth_context(key)))
        }
        ExprFunction::FrontendSettings => {
            let key = require_string(&args[0], ctx, "frontendSettings")?;
            Ok(ctx.sources.frontend_setting(&key).unwrap_or(ExprValue::Null))
        }
        ExprFunction::Text => {
            let Some(key) = evaluate(&args[0], ctx)?.as_string() else {
                return Ok(ExprValue::Null);
            };
            let resolved = ctx.sources.text_resource(&key).unwrap_or(key);
            Ok(ExprValue::String(resolved))
        }
        ExprFunction::Language => Ok(ExprValue::String(ctx.sources.language().to_string())),
        ExprFunction::Argv => {
            if ctx.positional.is_empty() {
                return Err(ExprError::NoPositionalArguments);
            }
            let index = evaluate(&args[0], ctx)?
                .as_number()?
                .ok_or(ExprError::InvalidArgument {
                    expected: "number",
                    got: ExprValue::Null,
                })?;
            let index = to_index(index);
            ctx.positional
                .get(index)
                .cloned()
                .ok_or(ExprError::PositionalIndexOutOfRange(index))
        }
    }
}

fn data_model(args: &[Expr], ctx: &ExprContext<'_>) -> Result<ExprValue, ExprError> {
    let field = require_string(&args[0], ctx, "dataModel")?;
    let data_type = match args.get(1) {
        Some(arg) => evaluate(arg, ctx)?.as_string(),
        None => None,
    };
    let data_type = match data_type {
        Some(explicit) => explicit,
        None => ctx
            .sources
            .default_data_type()
            .ok_or(ExprError::MissingDataType)?
            .to_string(),
    };

    if !ctx.sources.form_data().has_model(&data_type) {
        return Err(ExprError::UnknownDataType(data_type));
    }

    let mut reference = DataModelReference::new(data_type, field);

    // An unqualified field is implicitly row-scoped: transpose it into the
    // asking node's data model location when they live in the same model.
    if let Some(location) = &ctx.node.data_model_location {
        if location.data_type == reference.data_type {
            if let (Ok(subject), Ok(current)) =
                (reference.parsed_field(), location.parsed_field())
            {
                reference.field = subject.transpose(&current).to_string();
            }
        }
    }

    Ok(ctx
        .sources
        .form_data()
        .pick_simple(&reference)
        .as_ref()
        .map_or(ExprValue::Null, ExprValue::from_json))
}

fn truthy(arg: &Expr, ctx: &ExprContext<'_>) -> Result<bool, ExprError> {
    Ok(evaluate(arg, ctx)?.as_bool()?.unwrap_or(false))
}

fn eval_pair(args: &[Expr], ctx: &ExprContext<'_>) -> Result<(ExprValue, ExprValue), ExprError> {
    Ok((evaluate(&args[0], ctx)?, evaluate(&args[1], ctx)?))
}

fn eval_strings(
    args: &[Expr],
    ctx: &ExprContext<'_>,
) -> Result<(Option<String>, Option<String>), ExprError> {
    let (a, b) = eval_pair(args, ctx)?;
    Ok((a.as_string(), b.as_string()))
}

fn compare(
    args: &[Expr],
    ctx: &ExprContext<'_>,
    op: fn(f64, f64) -> bool,
) -> Result<ExprValue, ExprError> {
    let (a, b) = eval_pair(args, ctx)?;
    let result = match (a.as_number()?, b.as_number()?) {
        (Some(a), Some(b)) => op(a, b),
        // A null operand never satisfies a relational comparison.
        _ => false,
    };
    Ok(ExprValue::Bool(result))
}

fn require_string(arg: &Expr, ctx: &ExprContext<'_>, func: &'static str) -> Result<String, ExprError> {
    evaluate(arg, ctx)?
        .as_string()
        .ok_or(ExprError::NullKey { func })
}

fn map_string(value: ExprValue, f: impl Fn(&str) -> String) -> ExprValue {
    value
        .as_string()
        .map_or(ExprValue::Null, |s| ExprValue::String(f(&s)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_index(n: f64) -> usize {
    if n.is_finite() && n > 0.0 {
        n as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;
    use skjema_data::FormData;

    use super::*;
    use crate::sources::EvalNode;
    use crate::sources::ExpressionDataSources;

    struct TestSources {
        data: FormData,
        form_data_reads: Cell<usize>,
    }

    impl TestSources {
        fn new(data: serde_json::Value) -> Self {
            Self {
                data: FormData::new().with_model("model", data),
                form_data_reads: Cell::new(0),
            }
        }
    }

    impl ExpressionDataSources for TestSources {
        fn form_data(&self) -> &FormData {
            self.form_data_reads.set(self.form_data_reads.get() + 1);
            &self.data
        }

        fn default_data_type(&self) -> Option<&str> {
            Some("model")
        }

        fn instance_context(&self, key: InstanceContextKey) -> Option<String> {
            match key {
                InstanceContextKey::InstanceId => Some("512345/uuid".to_string()),
                _ => None,
            }
        }

        fn text_resource(&self, key: &str) -> Option<String> {
            (key == "greeting.title").then(|| "Hello".to_string())
        }

        fn language(&self) -> &str {
            "en"
        }
    }

    fn eval(sources: &TestSources, raw: serde_json::Value) -> Result<ExprValue, ExprError> {
        let node = EvalNode::default();
        let expr = Expr::parse(&raw).unwrap();
        evaluate(&expr, &ExprContext::new(sources, &node))
    }

    #[test]
    fn or_short_circuits_left_to_right() {
        let sources = TestSources::new(json!({ "A": "true", "B": "true" }));
        let result = eval(&sources, json!(["or", ["dataModel", "A"], ["dataModel", "B"]]));
        assert_eq!(result, Ok(ExprValue::Bool(true)));
        // One lookup reads form data twice; the B lookup never runs.
        assert_eq!(sources.form_data_reads.get(), 2);
    }

    #[test]
    fn and_short_circuits_on_first_false() {
        let sources = TestSources::new(json!({ "A": "false", "B": "true" }));
        let result = eval(&sources, json!(["and", ["dataModel", "A"], ["dataModel", "B"]]));
        assert_eq!(result, Ok(ExprValue::Bool(false)));
        assert_eq!(sources.form_data_reads.get(), 2);
    }

    #[test]
    fn if_only_evaluates_taken_branch() {
        let sources = TestSources::new(json!({ "A": "yes" }));
        let result = eval(
            &sources,
            json!(["if", false, ["dataModel", "A"], "else", "fallback"]),
        );
        assert_eq!(result, Ok(ExprValue::String("fallback".into())));
        assert_eq!(sources.form_data_reads.get(), 0);
    }

    #[test]
    fn equals_compares_stringified_values() {
        let sources = TestSources::new(json!({ "Age": 36 }));
        assert_eq!(
            eval(&sources, json!(["equals", ["dataModel", "Age"], "36"])),
            Ok(ExprValue::Bool(true))
        );
        assert_eq!(
            eval(&sources, json!(["notEquals", null, "x"])),
            Ok(ExprValue::Bool(true))
        );
    }

    #[test]
    fn relational_ops_treat_null_as_false() {
        let sources = TestSources::new(json!({}));
        assert_eq!(
            eval(&sources, json!(["greaterThan", null, 5])),
            Ok(ExprValue::Bool(false))
        );
        assert_eq!(
            eval(&sources, json!(["lessThan", 3, 5])),
            Ok(ExprValue::Bool(true))
        );
    }

    #[test]
    fn numeric_coercion_is_strict() {
        let sources = TestSources::new(json!({}));
        let err = eval(&sources, json!(["greaterThan", "abc", 5])).unwrap_err();
        assert!(matches!(err, ExprError::InvalidArgument { expected: "number", .. }));
    }

    #[test]
    fn string_helpers() {
        let sources = TestSources::new(json!({}));
        assert_eq!(
            eval(&sources, json!(["concat", "a", null, 5])),
            Ok(ExprValue::String("a5".into()))
        );
        assert_eq!(
            eval(&sources, json!(["commaContains", "a, b ,c", "b"])),
            Ok(ExprValue::Bool(true))
        );
        assert_eq!(eval(&sources, json!(["stringLength", null])), Ok(ExprValue::Number(0.0)));
        assert_eq!(
            eval(&sources, json!(["upperCase", "abc"])),
            Ok(ExprValue::String("ABC".into()))
        );
        assert_eq!(eval(&sources, json!(["lowerCase", null])), Ok(ExprValue::Null));
    }

    #[test]
    fn round_formats_with_decimals() {
        let sources = TestSources::new(json!({}));
        assert_eq!(
            eval(&sources, json!(["round", 4.567, 2])),
            Ok(ExprValue::String("4.57".into()))
        );
        assert_eq!(eval(&sources, json!(["round", null])), Ok(ExprValue::String("0".into())));
    }

    #[test]
    fn data_model_transposes_into_row_context() {
        let sources = TestSources::new(json!({
            "Persons": [ { "Name": "Ada", "Age": 36 }, { "Name": "Bob", "Age": 25 } ]
        }));
        let node = EvalNode {
            indexed_id: Some("age-1".to_string()),
            page: None,
            data_model_location: Some(DataModelReference::new("model", "Persons[1].Age")),
        };
        let expr = Expr::parse(&json!(["dataModel", "Persons.Name"])).unwrap();
        let result = evaluate(&expr, &ExprContext::new(&sources, &node));
        assert_eq!(result, Ok(ExprValue::String("Bob".into())));
    }

    #[test]
    fn data_model_unknown_type_is_an_error() {
        let sources = TestSources::new(json!({}));
        assert_eq!(
            eval(&sources, json!(["dataModel", "Field", "nope"])),
            Err(ExprError::UnknownDataType("nope".into()))
        );
    }

    #[test]
    fn instance_context_rejects_unknown_keys() {
        let sources = TestSources::new(json!({}));
        assert_eq!(
            eval(&sources, json!(["instanceContext", "instanceId"])),
            Ok(ExprValue::String("512345/uuid".into()))
        );
        assert_eq!(
            eval(&sources, json!(["instanceContext", "secretKey"])),
            Err(ExprError::UnknownInstanceContextKey("secretKey".into()))
        );
    }

    #[test]
    fn text_falls_back_to_the_key() {
        let sources = TestSources::new(json!({}));
        assert_eq!(
            eval(&sources, json!(["text", "greeting.title"])),
            Ok(ExprValue::String("Hello".into()))
        );
        assert_eq!(
            eval(&sources, json!(["text", "missing.key"])),
            Ok(ExprValue::String("missing.key".into()))
        );
    }

    #[test]
    fn argv_reads_positional_arguments() {
        let sources = TestSources::new(json!({}));
        let node = EvalNode::default();
        let positional = [ExprValue::String("first".into())];
        let expr = Expr::parse(&json!(["argv", 0])).unwrap();
        let ctx = ExprContext::new(&sources, &node).with_positional(&positional);
        assert_eq!(evaluate(&expr, &ctx), Ok(ExprValue::String("first".into())));

        let out_of_range = Expr::parse(&json!(["argv", 1])).unwrap();
        assert_eq!(
            evaluate(&out_of_range, &ctx),
            Err(ExprError::PositionalIndexOutOfRange(1))
        );
    }

    #[test]
    fn evaluate_with_default_recovers() {
        let sources = TestSources::new(json!({}));
        let node = EvalNode::default();
        let expr = Expr::parse(&json!(["dataModel", "Field", "nope"])).unwrap();
        let ctx = ExprContext::new(&sources, &node);
        assert_eq!(
            evaluate_with_default(&expr, &ctx, ExprValue::Bool(false)),
            ExprValue::Bool(false)
        );
    }
}
