//! Structural validation of action messages.
//!
//! Wire messages are validated in two steps: deserialisation checks field presence and types,
//! then [`Validate`] checks formats and cross-field rules on the typed value. The `validate_*`
//! functions run both steps over raw JSON.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::{
    is_valid_address, is_valid_decimal, is_valid_hex, SchemaValidationError, ValidationIssue,
};
use crate::{
    dto::{
        ActionMetadata, EVMTransaction, LegacyAction, LegacyActionType, LinkedAction,
        NextActionLink, TransactionRequest, TransactionResponse,
    },
    parameter::{ActionParameter, ParameterOption, TypedActionParameter},
};

static DATA_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:image/[a-zA-Z0-9.+-]+;base64,[A-Za-z0-9+/]+=*$")
        .expect("data image regex is valid")
});

/// Semantic checks on an already deserialised value.
pub trait Validate {
    /// Appends every problem found to `issues`, prefixing paths with `path`.
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>);

    fn validate(&self) -> Result<(), SchemaValidationError> {
        let mut issues = Vec::new();
        self.collect_issues("", &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError::new(issues))
        }
    }
}

fn field(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn index(path: &str, i: usize) -> String {
    format!("{path}[{i}]")
}

fn require_non_empty(path: &str, name: &str, value: &str, issues: &mut Vec<ValidationIssue>) {
    if value.trim().is_empty() {
        issues.push(ValidationIssue::new(&field(path, name), "must not be empty"));
    }
}

/// Accepts absolute http(s) URLs, base64 image data URLs and root-relative paths.
pub fn is_valid_icon(icon: &str) -> bool {
    if icon.starts_with('/') {
        return !icon.starts_with("//");
    }
    if icon.starts_with("data:") {
        return DATA_IMAGE.is_match(icon);
    }
    Url::parse(icon)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

impl Validate for ActionMetadata {
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>) {
        require_non_empty(path, "title", &self.title, issues);
        require_non_empty(path, "description", &self.description, issues);
        if !is_valid_icon(&self.icon) {
            issues.push(ValidationIssue::new(
                &field(path, "icon"),
                "must be an absolute http(s) URL, a base64 image data URL or a root-relative path",
            ));
        }
        if let Some(label) = &self.label {
            require_non_empty(path, "label", label, issues);
        }
        let actions_path = field(path, "actions");
        for (i, action) in self.actions.iter().enumerate() {
            action.collect_issues(&index(&actions_path, i), issues);
        }
        let links_path = field(path, "links.actions");
        for (i, action) in self.linked_actions().iter().enumerate() {
            action.collect_issues(&index(&links_path, i), issues);
        }
        if !self.has_actions() {
            issues.push(ValidationIssue::new(path, "must have at least one action"));
        }
    }
}

impl Validate for LegacyAction {
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>) {
        require_non_empty(path, "label", &self.label, issues);
        if self.kind == LegacyActionType::Button {
            match &self.value {
                Some(value) => require_non_empty(path, "value", value, issues),
                None => issues.push(ValidationIssue::new(
                    &field(path, "value"),
                    "is required for buttons",
                )),
            }
        }
    }
}

impl Validate for LinkedAction {
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>) {
        require_non_empty(path, "href", &self.href, issues);
        require_non_empty(path, "label", &self.label, issues);
        let params_path = field(path, "parameters");
        for (i, param) in self.parameters.iter().enumerate() {
            param.collect_issues(&index(&params_path, i), issues);
        }
    }
}

impl Validate for TypedActionParameter {
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>) {
        let base = self.base();
        base.collect_issues(path, issues);
        match self {
            TypedActionParameter::Plain(_) if base.kind.is_selectable() => {
                issues.push(ValidationIssue::new(
                    &field(path, "options"),
                    format!("are required for {} parameters", base.kind),
                ));
            }
            TypedActionParameter::Plain(_) => {}
            TypedActionParameter::Selectable(_) if !base.kind.is_selectable() => {
                issues.push(ValidationIssue::new(
                    &field(path, "options"),
                    format!("are not allowed for {} parameters", base.kind),
                ));
            }
            TypedActionParameter::Selectable(selectable) => {
                let options_path = field(path, "options");
                if selectable.options.is_empty() {
                    issues.push(ValidationIssue::new(&options_path, "must not be empty"));
                }
                for (i, option) in selectable.options.iter().enumerate() {
                    option.collect_issues(&index(&options_path, i), issues);
                }
            }
        }
    }
}

impl Validate for ActionParameter {
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>) {
        require_non_empty(path, "name", &self.name, issues);
        if let Some(pattern) = &self.pattern {
            if let Err(err) = Regex::new(pattern) {
                issues.push(ValidationIssue::new(
                    &field(path, "pattern"),
                    format!("is not a valid regular expression: {err}"),
                ));
            }
        }
        if self.kind.is_numeric() {
            for (name, bound) in [("min", &self.min), ("max", &self.max)] {
                if let Some(bound) = bound {
                    if bound.as_f64().is_none() {
                        issues.push(ValidationIssue::new(&field(path, name), "must be numeric"));
                    }
                }
            }
            let min = self.min.as_ref().and_then(|b| b.as_f64());
            let max = self.max.as_ref().and_then(|b| b.as_f64());
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    issues.push(ValidationIssue::new(path, "min must not exceed max"));
                }
            }
        }
    }
}

impl Validate for ParameterOption {
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>) {
        require_non_empty(path, "label", &self.label, issues);
        require_non_empty(path, "value", &self.value, issues);
    }
}

impl Validate for TransactionRequest {
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>) {
        if !is_valid_address(&self.account) {
            issues.push(ValidationIssue::new(&field(path, "account"), "must be a valid address"));
        }
    }
}

impl Validate for EVMTransaction {
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>) {
        if !is_valid_address(&self.to) {
            issues.push(ValidationIssue::new(&field(path, "to"), "must be a valid address"));
        }
        if !is_valid_decimal(&self.value) {
            issues.push(ValidationIssue::new(
                &field(path, "value"),
                "must be a decimal integer string",
            ));
        }
        if !is_valid_hex(&self.data) {
            issues.push(ValidationIssue::new(&field(path, "data"), "must be 0x-prefixed hex"));
        }
        if self.chain_id == 0 {
            issues.push(ValidationIssue::new(&field(path, "chainId"), "must be positive"));
        }
    }
}

impl Validate for TransactionResponse {
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>) {
        if let Some(transaction) = &self.transaction {
            transaction.collect_issues(&field(path, "transaction"), issues);
        }
        if let Some(transactions) = &self.transactions {
            let transactions_path = field(path, "transactions");
            for (i, transaction) in transactions.iter().enumerate() {
                transaction.collect_issues(&index(&transactions_path, i), issues);
            }
        }
        if self.transaction.is_none() && self.transactions.is_none() {
            issues.push(ValidationIssue::new(
                path,
                "must include either transaction or transactions",
            ));
        }
        if let Some(next) = self.next() {
            next.collect_issues(&field(path, "links.next"), issues);
        }
    }
}

impl Validate for NextActionLink {
    fn collect_issues(&self, path: &str, issues: &mut Vec<ValidationIssue>) {
        match self {
            NextActionLink::Post { href } => require_non_empty(path, "href", href, issues),
            NextActionLink::Inline { action } => {
                action.collect_issues(&field(path, "action"), issues)
            }
        }
    }
}

fn parse_and_validate<T>(value: &Value) -> Result<T, SchemaValidationError>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = serde_json::from_value(value.clone())?;
    parsed.validate()?;
    Ok(parsed)
}

pub fn validate_action_metadata(value: &Value) -> Result<ActionMetadata, SchemaValidationError> {
    parse_and_validate(value)
}

pub fn validate_transaction_request(
    value: &Value,
) -> Result<TransactionRequest, SchemaValidationError> {
    parse_and_validate(value)
}

pub fn validate_transaction_response(
    value: &Value,
) -> Result<TransactionResponse, SchemaValidationError> {
    parse_and_validate(value)
}

pub fn validate_linked_action(value: &Value) -> Result<LinkedAction, SchemaValidationError> {
    parse_and_validate(value)
}

pub fn validate_parameter(value: &Value) -> Result<TypedActionParameter, SchemaValidationError> {
    parse_and_validate(value)
}
