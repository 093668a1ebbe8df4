//! Variable-expression parser.
//!
//! An expression is a bare column name (`Turb_YSI`) or a column wrapped in one
//! transform function (`log(TP)`). `log` and `log10` both mean base-10,
//! `ln` is the natural log.

use crate::domain::{Transform, Variable};
use crate::error::QwError;

/// Split `expr` into its transform and raw variable name.
pub fn parse(expr: &str) -> Result<(Transform, String), QwError> {
    let expr = expr.trim();
    let malformed = || QwError::MalformedExpression(expr.to_string());

    let Some(open) = expr.find('(') else {
        if expr.is_empty() || expr.contains(')') {
            return Err(malformed());
        }
        return Ok((Transform::Identity, expr.to_string()));
    };

    let inner = expr[open + 1..].strip_suffix(')').ok_or_else(malformed)?.trim();
    if inner.is_empty() || inner.contains(['(', ')']) {
        return Err(malformed());
    }

    let function = expr[..open].trim();
    let transform = match function {
        "log" | "log10" => Transform::Log10,
        "ln" => Transform::Ln,
        "" => return Err(malformed()),
        other => {
            return Err(QwError::UnknownTransform {
                function: other.to_string(),
                expr: expr.to_string(),
            });
        }
    };

    Ok((transform, inner.to_string()))
}

pub fn parse_variable(expr: &str) -> Result<Variable, QwError> {
    let (transform, name) = parse(expr)?;
    Ok(Variable { name, transform })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_as_base_ten() {
        assert_eq!(parse("log(TP)").unwrap(), (Transform::Log10, "TP".to_string()));
        assert_eq!(parse("log10( SSC )").unwrap(), (Transform::Log10, "SSC".to_string()));
        assert_eq!(parse("ln(Discharge)").unwrap(), (Transform::Ln, "Discharge".to_string()));
        assert_eq!(parse("Turb_YSI").unwrap(), (Transform::Identity, "Turb_YSI".to_string()));
    }

    #[test]
    fn parse_is_idempotent_on_raw_names() {
        let (_, raw) = parse("log(TP)").unwrap();
        assert_eq!(parse(&raw).unwrap(), (Transform::Identity, "TP".to_string()));
    }

    #[test]
    fn rewrapping_reproduces_the_transform() {
        let (transform, raw) = parse("log(TP)").unwrap();
        let rewrapped = transform.wrap(&raw);
        assert_eq!(parse(&rewrapped).unwrap(), (Transform::Log10, "TP".to_string()));
    }

    #[test]
    fn unknown_function_is_rejected() {
        assert!(matches!(
            parse("sqrt(TP)"),
            Err(QwError::UnknownTransform { function, .. }) if function == "sqrt"
        ));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for expr in ["", "log(TP", "log()", "(TP)", "log(ln(TP))", "TP)"] {
            assert!(
                matches!(parse(expr), Err(QwError::MalformedExpression(_))),
                "expected malformed: {expr:?}"
            );
        }
    }
}
