//! Typed action parameters.
//!
//! A parameter is either *plain* (a single free-form input such as text, an amount or an address)
//! or *selectable* (a fixed list of options rendered as a select, radio group or checkboxes). Both
//! variants share [`ActionParameter`] as their base record; the declared [`ParameterType`] decides
//! which variant applies.
use std::{collections::HashMap, fmt, ops::Not};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Declared input type of a parameter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ParameterType {
    #[default]
    Text,
    Number,
    Email,
    Url,
    Date,
    DatetimeLocal,
    Textarea,
    Address,
    Token,
    Amount,
    Select,
    Radio,
    Checkbox,
}

impl ParameterType {
    /// Whether values of this type are picked from a list of options.
    pub fn is_selectable(&self) -> bool {
        matches!(self, ParameterType::Select | ParameterType::Radio | ParameterType::Checkbox)
    }

    /// Whether values of this type must parse as a finite number.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ParameterType::Number | ParameterType::Amount)
    }

    pub fn is_date(&self) -> bool {
        matches!(self, ParameterType::Date | ParameterType::DatetimeLocal)
    }
}

/// Lower or upper bound of a parameter. Producers may send either a JSON number or a string
/// (e.g. `"0.01"` or `"2024-01-01"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterBound {
    Number(f64),
    Text(String),
}

impl ParameterBound {
    /// Numeric value of the bound, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterBound::Number(n) => Some(*n),
            ParameterBound::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParameterBound::Number(_) => None,
            ParameterBound::Text(s) => Some(s.as_str()),
        }
    }
}

impl fmt::Display for ParameterBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterBound::Number(n) => write!(f, "{n}"),
            ParameterBound::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for ParameterBound {
    fn from(value: f64) -> Self {
        ParameterBound::Number(value)
    }
}

impl From<i64> for ParameterBound {
    fn from(value: i64) -> Self {
        ParameterBound::Number(value as f64)
    }
}

impl From<&str> for ParameterBound {
    fn from(value: &str) -> Self {
        ParameterBound::Text(value.to_string())
    }
}

impl From<String> for ParameterBound {
    fn from(value: String) -> Self {
        ParameterBound::Text(value)
    }
}

/// Fields shared by every parameter variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParameter {
    #[serde(rename = "type", default)]
    pub kind: ParameterType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Not::not")]
    pub required: bool,
    /// Regular expression the value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Human readable explanation shown when `pattern` does not match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<ParameterBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ParameterBound>,
}

impl ActionParameter {
    pub fn new(kind: ParameterType, name: &str) -> Self {
        Self { kind, name: name.to_string(), ..Default::default() }
    }

    /// The label if one is set and non-empty, the name otherwise.
    pub fn display_name(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParameterOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Not::not")]
    pub selected: bool,
}

impl ParameterOption {
    pub fn new(label: &str, value: &str) -> Self {
        Self { label: label.to_string(), value: value.to_string(), selected: false }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectableParameter {
    #[serde(flatten)]
    pub base: ActionParameter,
    pub options: Vec<ParameterOption>,
}

/// A parameter as it appears on the wire.
///
/// Deserialization tries the selectable shape first (it is the only one carrying `options`) and
/// falls back to the plain one. A selectable type without options therefore lands in
/// [`TypedActionParameter::Plain`] and is rejected by schema validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedActionParameter {
    Selectable(SelectableParameter),
    Plain(ActionParameter),
}

impl TypedActionParameter {
    pub fn base(&self) -> &ActionParameter {
        match self {
            TypedActionParameter::Selectable(p) => &p.base,
            TypedActionParameter::Plain(p) => p,
        }
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn kind(&self) -> ParameterType {
        self.base().kind
    }

    /// Options of a selectable parameter; empty for plain ones.
    pub fn options(&self) -> &[ParameterOption] {
        match self {
            TypedActionParameter::Selectable(p) => &p.options,
            TypedActionParameter::Plain(_) => &[],
        }
    }

    pub fn is_selectable(&self) -> bool {
        is_selectable_param(self)
    }
}

impl From<ActionParameter> for TypedActionParameter {
    fn from(value: ActionParameter) -> Self {
        TypedActionParameter::Plain(value)
    }
}

impl From<SelectableParameter> for TypedActionParameter {
    fn from(value: SelectableParameter) -> Self {
        TypedActionParameter::Selectable(value)
    }
}

/// Discriminates parameters by their declared type rather than by their shape.
pub fn is_selectable_param(param: &TypedActionParameter) -> bool {
    param.kind().is_selectable()
}

/// A user supplied parameter value. Multi-select parameters carry several values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Parameter values keyed by parameter name.
pub type ParameterValues = HashMap<String, ParameterValue>;

impl ParameterValue {
    /// True for the empty string and the empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            ParameterValue::Single(v) => v.is_empty(),
            ParameterValue::Multiple(v) => v.is_empty(),
        }
    }

    /// The value itself, or the first element of a list.
    pub fn first(&self) -> Option<&str> {
        match self {
            ParameterValue::Single(v) => Some(v.as_str()),
            ParameterValue::Multiple(v) => v.first().map(String::as_str),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            ParameterValue::Single(v) => vec![v.as_str()],
            ParameterValue::Multiple(v) => v.iter().map(String::as_str).collect(),
        }
    }

    /// Single values as-is, lists joined with a comma.
    pub fn joined(&self) -> String {
        match self {
            ParameterValue::Single(v) => v.clone(),
            ParameterValue::Multiple(v) => v.join(","),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Single(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Single(value)
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(value: Vec<String>) -> Self {
        ParameterValue::Multiple(value)
    }
}

impl From<Vec<&str>> for ParameterValue {
    fn from(value: Vec<&str>) -> Self {
        ParameterValue::Multiple(
            value
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
    }
}
