//! Validation of everything crossing a trust boundary.
//!
//! Two independent layers live here:
//! - [`schema`]: structural and semantic validation of wire messages and action definitions.
//! - [`parameters`]: validation of user entered parameter values against their declarations.
//!
//! Both are total: they report failures through `Result` and never panic on input data. All
//! problems found are collected so a caller can report them in a single pass.
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub mod parameters;
pub mod schema;

pub use parameters::{validate_parameter_values, ParameterValidationError};
pub use schema::{
    validate_action_metadata, validate_linked_action, validate_parameter,
    validate_transaction_request, validate_transaction_response, Validate,
};

static ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address regex is valid"));
static HEX_DATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]*$").expect("hex regex is valid"));
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("decimal regex is valid"));

/// A 0x-prefixed, 40 hex digit account address. Checksums are not verified.
pub fn is_valid_address(value: &str) -> bool {
    ADDRESS.is_match(value)
}

/// 0x-prefixed hex data of any length, including the empty `0x`.
pub fn is_valid_hex(value: &str) -> bool {
    HEX_DATA.is_match(value)
}

/// Unsigned decimal integer, as used for wei amounts.
pub fn is_valid_decimal(value: &str) -> bool {
    DECIMAL.is_match(value)
}

/// A single validation failure located by a dotted path, e.g. `links.actions[0].href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: &str, message: impl Into<String>) -> Self {
        Self { path: path.to_string(), message: message.into() }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A value failed structural or semantic validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", join_issues(.issues))]
pub struct SchemaValidationError {
    issues: Vec<ValidationIssue>,
}

impl SchemaValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn single(path: &str, message: impl Into<String>) -> Self {
        Self::new(vec![ValidationIssue::new(path, message)])
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

impl From<serde_json::Error> for SchemaValidationError {
    fn from(err: serde_json::Error) -> Self {
        SchemaValidationError::single("", err.to_string())
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
