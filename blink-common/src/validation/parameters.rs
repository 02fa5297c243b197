//! Validation of user entered parameter values.
//!
//! Unlike schema validation, failures here are recoverable: the caller is expected to show the
//! messages, let the user correct the values and submit again. Every parameter is checked and
//! all messages are reported together.
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

use super::is_valid_address;
use crate::parameter::{
    ActionParameter, ParameterBound, ParameterType, ParameterValue, ParameterValues,
    TypedActionParameter,
};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

const DATETIME_LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// One or more parameter values violate their declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .errors.join("; "))]
pub struct ParameterValidationError {
    errors: Vec<String>,
}

impl ParameterValidationError {
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// Checks `values` against `parameters`.
///
/// For each parameter, in order:
/// 1. a required parameter without a value (absent, empty string or empty list) fails and no
///    further rule is applied to it;
/// 2. an optional parameter without a value is skipped;
/// 3. `pattern` must match the value (the first element for lists);
/// 4. `number` and `amount` values must be finite numbers within `min`/`max`;
/// 5. `address` values must be 0x-prefixed 40 hex digit addresses;
/// 6. `email`, `url`, date bounds and selectable options are checked last.
pub fn validate_parameter_values(
    parameters: &[TypedActionParameter],
    values: &ParameterValues,
) -> Result<(), ParameterValidationError> {
    let mut errors = Vec::new();
    for param in parameters {
        check_parameter(param, values.get(param.name()), &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ParameterValidationError { errors })
    }
}

fn check_parameter(
    param: &TypedActionParameter,
    value: Option<&ParameterValue>,
    errors: &mut Vec<String>,
) {
    let base = param.base();
    let name = base.display_name();

    let value = match value {
        Some(value) if !value.is_empty() => value,
        _ => {
            if base.required {
                errors.push(format!("{name} is required"));
            }
            return;
        }
    };
    let Some(first) = value.first() else {
        return;
    };

    if let Some(pattern) = &base.pattern {
        match Regex::new(pattern) {
            Ok(re) if !re.is_match(first) => errors.push(
                base.pattern_description
                    .clone()
                    .unwrap_or_else(|| format!("{name} does not match the required format")),
            ),
            Ok(_) => {}
            Err(_) => errors.push(format!("{name} cannot be validated: invalid pattern")),
        }
    }

    match base.kind {
        ParameterType::Number | ParameterType::Amount => check_number(base, first, errors),
        ParameterType::Address if !is_valid_address(first) => {
            errors.push(format!("{name} must be a valid address"))
        }
        ParameterType::Email if !EMAIL.is_match(first) => {
            errors.push(format!("{name} must be a valid email address"))
        }
        ParameterType::Url if Url::parse(first).is_err() => {
            errors.push(format!("{name} must be a valid URL"))
        }
        ParameterType::Date | ParameterType::DatetimeLocal => check_date(base, first, errors),
        _ => {}
    }

    if param.is_selectable() {
        let options = param.options();
        let unknown = value
            .values()
            .into_iter()
            .any(|v| !options.iter().any(|o| o.value == v));
        if unknown {
            errors.push(format!("{name} must be one of the available options"));
        }
    }
}

fn check_number(param: &ActionParameter, value: &str, errors: &mut Vec<String>) {
    let name = param.display_name();
    let Some(number) = value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
    else {
        errors.push(format!("{name} must be a number"));
        return;
    };

    if let Some(min) = &param.min {
        if min
            .as_f64()
            .is_some_and(|min| number < min)
        {
            errors.push(format!("{name} must be at least {min}"));
        }
    }
    if let Some(max) = &param.max {
        if max
            .as_f64()
            .is_some_and(|max| number > max)
        {
            errors.push(format!("{name} must be at most {max}"));
        }
    }
}

fn parse_date(kind: ParameterType, value: &str) -> Option<NaiveDateTime> {
    match kind {
        ParameterType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        _ => DATETIME_LOCAL_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok()),
    }
}

/// Range checks date values against textual bounds. Bounds or values that do not parse are
/// ignored.
fn check_date(param: &ActionParameter, value: &str, errors: &mut Vec<String>) {
    let name = param.display_name();
    let Some(date) = parse_date(param.kind, value) else {
        return;
    };
    let parse_bound =
        |bound: &ParameterBound| bound.as_text().and_then(|b| parse_date(param.kind, b));

    if let Some(min) = &param.min {
        if parse_bound(min).is_some_and(|min| date < min) {
            errors.push(format!("{name} must be on or after {min}"));
        }
    }
    if let Some(max) = &param.max {
        if parse_bound(max).is_some_and(|max| date > max) {
            errors.push(format!("{name} must be on or before {max}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use maplit::hashmap;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::parameter::{ParameterOption, SelectableParameter};

    fn amount_param() -> TypedActionParameter {
        ActionParameter {
            kind: ParameterType::Amount,
            name: "amount".to_string(),
            label: Some("Amount".to_string()),
            required: true,
            min: Some(ParameterBound::Number(1.0)),
            max: Some(ParameterBound::Number(100.0)),
            ..Default::default()
        }
        .into()
    }

    fn address_param() -> TypedActionParameter {
        ActionParameter {
            kind: ParameterType::Address,
            name: "recipient".to_string(),
            required: true,
            ..Default::default()
        }
        .into()
    }

    fn errors_for(params: &[TypedActionParameter], values: &ParameterValues) -> Vec<String> {
        validate_parameter_values(params, values)
            .err()
            .map(|err| err.errors().to_vec())
            .unwrap_or_default()
    }

    #[rstest]
    #[case::below_min("0", vec!["Amount must be at least 1"])]
    #[case::above_max("100.5", vec!["Amount must be at most 100"])]
    #[case::not_a_number("abc", vec!["Amount must be a number"])]
    #[case::infinite("inf", vec!["Amount must be a number"])]
    #[case::in_range("42.5", vec![])]
    #[case::at_bounds("100", vec![])]
    fn test_amount_rules(#[case] value: &str, #[case] expected: Vec<&str>) {
        let values = hashmap! { "amount".to_string() => ParameterValue::from(value) };

        assert_eq!(errors_for(&[amount_param()], &values), expected);
    }

    #[rstest]
    #[case::missing(None)]
    #[case::empty_string(Some(ParameterValue::from("")))]
    #[case::empty_list(Some(ParameterValue::Multiple(vec![])))]
    fn test_required(#[case] value: Option<ParameterValue>) {
        let values: ParameterValues = value
            .into_iter()
            .map(|v| ("amount".to_string(), v))
            .collect();

        assert_eq!(errors_for(&[amount_param()], &values), vec!["Amount is required"]);
    }

    #[test]
    fn test_optional_without_value_is_skipped() {
        let param: TypedActionParameter = ActionParameter {
            kind: ParameterType::Number,
            name: "tip".to_string(),
            pattern: Some("^[0-9]+$".to_string()),
            ..Default::default()
        }
        .into();

        assert!(validate_parameter_values(&[param], &ParameterValues::new()).is_ok());
    }

    #[test]
    fn test_all_violations_are_combined() {
        let values = hashmap! {
            "amount".to_string() => ParameterValue::from("0"),
            "recipient".to_string() => ParameterValue::from("alice"),
        };

        let err = validate_parameter_values(&[amount_param(), address_param()], &values)
            .unwrap_err();

        assert_eq!(err.errors().len(), 2);
        assert_eq!(
            err.to_string(),
            "Amount must be at least 1; recipient must be a valid address"
        );
    }

    #[test]
    fn test_pattern_uses_description() {
        let param: TypedActionParameter = ActionParameter {
            kind: ParameterType::Text,
            name: "code".to_string(),
            pattern: Some("^[A-Z]{3}$".to_string()),
            pattern_description: Some("Use three capital letters".to_string()),
            ..Default::default()
        }
        .into();
        let values = hashmap! { "code".to_string() => ParameterValue::from("abc") };

        assert_eq!(errors_for(&[param], &values), vec!["Use three capital letters"]);
    }

    #[test]
    fn test_pattern_checks_first_list_element() {
        let param: TypedActionParameter = ActionParameter {
            kind: ParameterType::Text,
            name: "codes".to_string(),
            pattern: Some("^[a-z]+$".to_string()),
            ..Default::default()
        }
        .into();
        let ok = hashmap! { "codes".to_string() => ParameterValue::from(vec!["abc", "123"]) };
        let bad = hashmap! { "codes".to_string() => ParameterValue::from(vec!["123", "abc"]) };

        assert!(validate_parameter_values(&[param.clone()], &ok).is_ok());
        assert_eq!(
            errors_for(&[param], &bad),
            vec!["codes does not match the required format"]
        );
    }

    #[rstest]
    #[case::email(ParameterType::Email, "not-an-email", "contact must be a valid email address")]
    #[case::url(ParameterType::Url, "example dot com", "contact must be a valid URL")]
    fn test_format_rules(#[case] kind: ParameterType, #[case] value: &str, #[case] error: &str) {
        let param: TypedActionParameter = ActionParameter::new(kind, "contact").into();
        let values = hashmap! { "contact".to_string() => ParameterValue::from(value) };

        assert_eq!(errors_for(&[param], &values), vec![error]);
    }

    #[rstest]
    #[case::before("2023-12-31", vec!["date must be on or after 2024-01-01"])]
    #[case::inside("2024-06-01", vec![])]
    #[case::after("2025-01-01", vec!["date must be on or before 2024-12-31"])]
    fn test_date_bounds(#[case] value: &str, #[case] expected: Vec<&str>) {
        let param: TypedActionParameter = ActionParameter {
            kind: ParameterType::Date,
            name: "date".to_string(),
            min: Some("2024-01-01".into()),
            max: Some("2024-12-31".into()),
            ..Default::default()
        }
        .into();
        let values = hashmap! { "date".to_string() => ParameterValue::from(value) };

        assert_eq!(errors_for(&[param], &values), expected);
    }

    #[rstest]
    #[case::before(
        "2024-01-01T09:00",
        "2024-01-01T17:00",
        "2024-01-01T08:59",
        vec!["meeting must be on or after 2024-01-01T09:00"]
    )]
    #[case::after(
        "2024-01-01T09:00",
        "2024-01-01T17:00",
        "2024-01-01T17:01",
        vec!["meeting must be on or before 2024-01-01T17:00"]
    )]
    #[case::inside_with_seconds(
        "2024-01-01T09:00",
        "2024-01-01T17:00",
        "2024-01-01T12:30:15",
        vec![]
    )]
    #[case::before_with_seconds(
        "2024-01-01T09:00:30",
        "2024-01-01T17:00",
        "2024-01-01T09:00:29",
        vec!["meeting must be on or after 2024-01-01T09:00:30"]
    )]
    #[case::unparsable_min_ignored("soon", "2024-01-01T17:00", "2020-01-01T00:00", vec![])]
    #[case::unparsable_max_ignored(
        "2024-01-01T09:00",
        "2024-13-01T17:00",
        "2030-01-01T00:00",
        vec![]
    )]
    fn test_datetime_local_bounds(
        #[case] min: &str,
        #[case] max: &str,
        #[case] value: &str,
        #[case] expected: Vec<&str>,
    ) {
        let param: TypedActionParameter = ActionParameter {
            kind: ParameterType::DatetimeLocal,
            name: "meeting".to_string(),
            min: Some(min.into()),
            max: Some(max.into()),
            ..Default::default()
        }
        .into();
        let values = hashmap! { "meeting".to_string() => ParameterValue::from(value) };

        assert_eq!(errors_for(&[param], &values), expected);
    }

    #[test]
    fn test_selectable_values_must_be_options() {
        let param: TypedActionParameter = SelectableParameter {
            base: ActionParameter::new(ParameterType::Checkbox, "tokens"),
            options: vec![ParameterOption::new("ETH", "eth"), ParameterOption::new("DAI", "dai")],
        }
        .into();
        let ok = hashmap! { "tokens".to_string() => ParameterValue::from(vec!["eth", "dai"]) };
        let bad = hashmap! { "tokens".to_string() => ParameterValue::from(vec!["eth", "btc"]) };

        assert!(validate_parameter_values(&[param.clone()], &ok).is_ok());
        assert_eq!(
            errors_for(&[param], &bad),
            vec!["tokens must be one of the available options"]
        );
    }
}
