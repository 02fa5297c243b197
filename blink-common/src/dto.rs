//! Data Transfer Objects (or structs)
//!
//! These structs serialise and deserialise the messages exchanged between action producers and
//! consumers. They carry no business logic; structural and semantic checks live in
//! [`crate::validation`].
use std::{collections::HashMap, ops::Not};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::parameter::{ParameterValue, TypedActionParameter};

/// Reserved `action` identifier selecting the free-text input of the legacy vocabulary.
pub const INPUT_ACTION: &str = "__input__";

/// Describes an offerable action. Returned by `GET <action-endpoint>`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMetadata {
    pub title: String,
    /// Absolute http(s) URL, base64 data URL or root-relative path.
    pub icon: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Legacy flat list of buttons and inputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<LegacyAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ActionLinks>,
    #[serde(default, skip_serializing_if = "Not::not")]
    pub disabled: bool,
}

impl ActionMetadata {
    pub fn linked_actions(&self) -> &[LinkedAction] {
        self.links
            .as_ref()
            .map(|links| links.actions.as_slice())
            .unwrap_or_default()
    }

    /// Whether the metadata offers at least one button, input or linked action.
    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty() || !self.linked_actions().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionLinks {
    #[serde(default)]
    pub actions: Vec<LinkedAction>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LegacyActionType {
    #[default]
    Button,
    Input,
}

/// Entry of the legacy vocabulary: a button carrying a fixed `value`, or a free-text input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LegacyAction {
    #[serde(rename = "type", default)]
    pub kind: LegacyActionType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl LegacyAction {
    pub fn button(label: &str, value: &str) -> Self {
        Self {
            kind: LegacyActionType::Button,
            label: label.to_string(),
            value: Some(value.to_string()),
            placeholder: None,
        }
    }

    pub fn input(label: &str, placeholder: Option<&str>) -> Self {
        Self {
            kind: LegacyActionType::Input,
            label: label.to_string(),
            value: None,
            placeholder: placeholder.map(str::to_string),
        }
    }

    pub fn is_input(&self) -> bool {
        self.kind == LegacyActionType::Input
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LinkedActionType {
    #[default]
    Transaction,
    Post,
    ExternalLink,
}

/// One invokable operation. `href` may contain `{name}` placeholders matching `parameters`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkedAction {
    pub href: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: LinkedActionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<TypedActionParameter>,
}

/// Body of `POST <action-endpoint>`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Address of the account that will sign the transactions.
    pub account: String,
    /// Selected legacy button value, [`INPUT_ACTION`], or the resolved href of a linked action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Free-text value of the legacy input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, ParameterValue>>,
}

/// An EVM transaction descriptor, opaque to the protocol and handed as-is to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EVMTransaction {
    pub to: String,
    /// Amount in wei as a decimal string.
    pub value: String,
    /// 0x-prefixed calldata.
    pub data: String,
    pub chain_id: u64,
}

/// Response to `POST <action-endpoint>`.
///
/// At least one of `transaction` and `transactions` is populated. Consumers prefer
/// `transactions` when both are present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<EVMTransaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<EVMTransaction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ResponseLinks>,
}

impl TransactionResponse {
    pub fn single(transaction: EVMTransaction) -> Self {
        Self { transaction: Some(transaction), ..Default::default() }
    }

    pub fn batch(transactions: Vec<EVMTransaction>) -> Self {
        Self { transactions: Some(transactions), ..Default::default() }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn with_next(mut self, next: NextActionLink) -> Self {
        self.links = Some(ResponseLinks { next: Some(next) });
        self
    }

    /// Transactions to sign, in order: `transactions` if present, else the single `transaction`.
    pub fn into_transactions(self) -> Vec<EVMTransaction> {
        match (self.transactions, self.transaction) {
            (Some(transactions), _) => transactions,
            (None, transaction) => transaction.into_iter().collect(),
        }
    }

    pub fn next(&self) -> Option<&NextActionLink> {
        self.links
            .as_ref()
            .and_then(|links| links.next.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NextActionLink>,
}

/// Points to the action offered once the transactions of a response are confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NextActionLink {
    /// The next metadata is obtained by POSTing a [`NextActionRequest`] to `href`.
    Post { href: String },
    /// The next metadata is embedded.
    Inline { action: Box<ActionMetadata> },
}

/// Body POSTed to a [`NextActionLink::Post`] callback.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NextActionRequest {
    pub account: String,
    /// Hash of the last broadcast transaction.
    pub signature: String,
}

/// Error payload returned with non-success statuses: `{"error": {"message": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionError {
    pub error: ActionErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionErrorBody {
    pub message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: ActionErrorBody { message: message.into() } }
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }
}
