//! Construction of action definitions.
//!
//! Definitions are validated eagerly: [`ActionDefinitionBuilder::build`] rejects an incomplete or
//! malformed definition immediately instead of deferring the failure to the first request.
//!
//! ## Example
//!
//! ```rust
//! use blink_common::{
//!     builder::{ActionDefinition, LinkedActionBuilder, ParameterBuilder},
//!     dto::{EVMTransaction, TransactionResponse},
//!     traits::{handler_fn, ActionContext},
//! };
//!
//! let definition = ActionDefinition::builder()
//!     .title("Donate")
//!     .icon("https://example.com/icon.png")
//!     .description("Support the project")
//!     .button("Send 0.1 ETH", "0.1")
//!     .linked_action(
//!         LinkedActionBuilder::new("Donate", "/api/actions/donate?amount={amount}")
//!             .parameter(ParameterBuilder::amount("amount").label("Amount").required(true)),
//!     )
//!     .handler(handler_fn(|ctx: ActionContext| async move {
//!         Ok(TransactionResponse::single(EVMTransaction {
//!             to: ctx.account,
//!             value: "0".to_string(),
//!             data: "0x".to_string(),
//!             chain_id: 1,
//!         }))
//!     }))
//!     .build()
//!     .expect("valid definition");
//!
//! assert_eq!(definition.metadata().title, "Donate");
//! ```
use std::{collections::HashSet, fmt, sync::Arc};

use thiserror::Error;
use tracing::warn;

use crate::{
    dto::{ActionLinks, ActionMetadata, LegacyAction, LinkedAction, LinkedActionType},
    parameter::{
        ActionParameter, ParameterBound, ParameterOption, ParameterType, SelectableParameter,
        TypedActionParameter,
    },
    template::extract_params,
    traits::ActionHandler,
    validation::{SchemaValidationError, Validate},
};

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Action definition is missing a {0}")]
    MissingField(&'static str),

    #[error("Action definition must have at least one action")]
    NoActions,

    #[error("Action definition is missing a handler")]
    MissingHandler,

    #[error("Duplicate parameter `{parameter}` in linked action `{action}`")]
    DuplicateParameter { action: String, parameter: String },

    #[error("Invalid action metadata: {0}")]
    InvalidMetadata(#[from] SchemaValidationError),
}

/// Metadata paired with the handler answering its transaction requests.
#[derive(Clone)]
pub struct ActionDefinition {
    metadata: ActionMetadata,
    handler: Arc<dyn ActionHandler>,
}

impl ActionDefinition {
    pub fn builder() -> ActionDefinitionBuilder {
        ActionDefinitionBuilder::default()
    }

    pub fn metadata(&self) -> &ActionMetadata {
        &self.metadata
    }

    pub fn handler(&self) -> &Arc<dyn ActionHandler> {
        &self.handler
    }
}

impl fmt::Debug for ActionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDefinition")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ActionDefinitionBuilder {
    title: Option<String>,
    icon: Option<String>,
    description: Option<String>,
    label: Option<String>,
    disabled: bool,
    actions: Vec<LegacyAction>,
    linked_actions: Vec<LinkedAction>,
    handler: Option<Arc<dyn ActionHandler>>,
}

impl ActionDefinitionBuilder {
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Primary button text.
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Adds a legacy button submitting `value` as the request's `action`.
    pub fn button(mut self, label: &str, value: &str) -> Self {
        self.actions
            .push(LegacyAction::button(label, value));
        self
    }

    /// Adds a legacy free-text input, selected with the `__input__` action identifier.
    pub fn input(mut self, label: &str, placeholder: Option<&str>) -> Self {
        self.actions
            .push(LegacyAction::input(label, placeholder));
        self
    }

    pub fn linked_action(mut self, action: impl Into<LinkedAction>) -> Self {
        self.linked_actions
            .push(action.into());
        self
    }

    pub fn handler<H>(mut self, handler: H) -> Self
    where
        H: ActionHandler + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Builds and validates the metadata alone, without requiring a handler.
    ///
    /// Used for metadata that is only ever embedded, e.g. as an inline next action.
    pub fn build_metadata(&self) -> Result<ActionMetadata, DefinitionError> {
        let title = required(&self.title, "title")?;
        let icon = required(&self.icon, "icon")?;
        let description = required(&self.description, "description")?;
        if self.actions.is_empty() && self.linked_actions.is_empty() {
            return Err(DefinitionError::NoActions);
        }

        for action in &self.linked_actions {
            check_linked_action(action)?;
        }

        let metadata = ActionMetadata {
            title,
            icon,
            description,
            label: self.label.clone(),
            actions: self.actions.clone(),
            links: (!self.linked_actions.is_empty())
                .then(|| ActionLinks { actions: self.linked_actions.clone() }),
            disabled: self.disabled,
        };
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn build(self) -> Result<ActionDefinition, DefinitionError> {
        let metadata = self.build_metadata()?;
        let handler = self
            .handler
            .ok_or(DefinitionError::MissingHandler)?;
        Ok(ActionDefinition { metadata, handler })
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, DefinitionError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.clone()),
        _ => Err(DefinitionError::MissingField(name)),
    }
}

/// Parameter names must be unique within a linked action. Placeholders without a matching
/// parameter are tolerated since the producer may fill them in itself.
fn check_linked_action(action: &LinkedAction) -> Result<(), DefinitionError> {
    let mut names = HashSet::new();
    for param in &action.parameters {
        if !names.insert(param.name()) {
            return Err(DefinitionError::DuplicateParameter {
                action: action.label.clone(),
                parameter: param.name().to_string(),
            });
        }
    }
    for placeholder in extract_params(&action.href) {
        if !names.contains(placeholder.as_str()) {
            warn!(
                action = %action.label,
                %placeholder,
                "Href placeholder has no matching parameter and will be sent unresolved"
            );
        }
    }
    Ok(())
}

pub struct LinkedActionBuilder {
    action: LinkedAction,
}

impl LinkedActionBuilder {
    pub fn new(label: &str, href: &str) -> Self {
        Self {
            action: LinkedAction {
                href: href.to_string(),
                label: label.to_string(),
                kind: LinkedActionType::Transaction,
                parameters: Vec::new(),
            },
        }
    }

    pub fn kind(mut self, kind: LinkedActionType) -> Self {
        self.action.kind = kind;
        self
    }

    pub fn parameter(mut self, parameter: impl Into<TypedActionParameter>) -> Self {
        self.action
            .parameters
            .push(parameter.into());
        self
    }

    pub fn build(self) -> LinkedAction {
        self.action
    }
}

impl From<LinkedActionBuilder> for LinkedAction {
    fn from(builder: LinkedActionBuilder) -> Self {
        builder.build()
    }
}

/// Builds a [`TypedActionParameter`]; the variant follows the declared type.
pub struct ParameterBuilder {
    base: ActionParameter,
    options: Vec<ParameterOption>,
}

impl ParameterBuilder {
    pub fn new(kind: ParameterType, name: &str) -> Self {
        Self { base: ActionParameter::new(kind, name), options: Vec::new() }
    }

    pub fn text(name: &str) -> Self {
        Self::new(ParameterType::Text, name)
    }

    pub fn number(name: &str) -> Self {
        Self::new(ParameterType::Number, name)
    }

    pub fn amount(name: &str) -> Self {
        Self::new(ParameterType::Amount, name)
    }

    pub fn address(name: &str) -> Self {
        Self::new(ParameterType::Address, name)
    }

    pub fn select(name: &str) -> Self {
        Self::new(ParameterType::Select, name)
    }

    pub fn radio(name: &str) -> Self {
        Self::new(ParameterType::Radio, name)
    }

    pub fn checkbox(name: &str) -> Self {
        Self::new(ParameterType::Checkbox, name)
    }

    pub fn label(mut self, label: &str) -> Self {
        self.base.label = Some(label.to_string());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.base.required = required;
        self
    }

    pub fn pattern(mut self, pattern: &str, description: Option<&str>) -> Self {
        self.base.pattern = Some(pattern.to_string());
        self.base.pattern_description = description.map(str::to_string);
        self
    }

    pub fn min(mut self, min: impl Into<ParameterBound>) -> Self {
        self.base.min = Some(min.into());
        self
    }

    pub fn max(mut self, max: impl Into<ParameterBound>) -> Self {
        self.base.max = Some(max.into());
        self
    }

    pub fn option(mut self, label: &str, value: &str) -> Self {
        self.options
            .push(ParameterOption::new(label, value));
        self
    }

    /// Adds an option that is pre-selected.
    pub fn selected_option(mut self, label: &str, value: &str) -> Self {
        self.options
            .push(ParameterOption { selected: true, ..ParameterOption::new(label, value) });
        self
    }

    /// Options given to a plain parameter are dropped.
    pub fn build(self) -> TypedActionParameter {
        if self.base.kind.is_selectable() {
            TypedActionParameter::Selectable(SelectableParameter {
                base: self.base,
                options: self.options,
            })
        } else {
            TypedActionParameter::Plain(self.base)
        }
    }
}

impl From<ParameterBuilder> for TypedActionParameter {
    fn from(builder: ParameterBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        dto::{EVMTransaction, TransactionResponse},
        traits::{handler_fn, ActionContext},
    };

    fn noop_handler() -> impl ActionHandler {
        handler_fn(|_ctx: ActionContext| async {
            Ok(TransactionResponse::single(EVMTransaction::default()))
        })
    }

    fn complete_builder() -> ActionDefinitionBuilder {
        ActionDefinition::builder()
            .title("Swap")
            .icon("/icon.png")
            .description("Swap tokens")
            .linked_action(
                LinkedActionBuilder::new("Swap", "/api/swap?amount={amount}&token={token}")
                    .parameter(
                        ParameterBuilder::amount("amount")
                            .label("Amount")
                            .required(true)
                            .min(0.01),
                    )
                    .parameter(
                        ParameterBuilder::select("token")
                            .selected_option("USDC", "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")
                            .option("DAI", "0x6b175474e89094c44da98b954eedeac495271d0f"),
                    ),
            )
    }

    #[test]
    fn test_build_definition() {
        let definition = complete_builder()
            .handler(noop_handler())
            .build()
            .unwrap();

        let metadata = definition.metadata();
        assert_eq!(metadata.title, "Swap");
        assert!(metadata.actions.is_empty());
        let linked = &metadata.linked_actions()[0];
        assert_eq!(linked.parameters.len(), 2);
        assert!(!linked.parameters[0].is_selectable());
        assert!(linked.parameters[1].is_selectable());
        assert!(linked.parameters[1].options()[0].selected);
    }

    #[test]
    fn test_build_with_both_vocabularies() {
        let definition = complete_builder()
            .button("Swap 1", "1")
            .input("Custom", Some("amount"))
            .handler(noop_handler())
            .build()
            .unwrap();

        assert_eq!(definition.metadata().actions.len(), 2);
        assert_eq!(
            definition
                .metadata()
                .linked_actions()
                .len(),
            1
        );
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let err = ActionDefinition::builder()
            .icon("/icon.png")
            .description("d")
            .button("Go", "go")
            .handler(noop_handler())
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::MissingField("title")));

        let err = ActionDefinition::builder()
            .title("t")
            .icon("/icon.png")
            .description("  ")
            .button("Go", "go")
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::MissingField("description")));
    }

    #[test]
    fn test_no_actions_is_rejected() {
        let err = ActionDefinition::builder()
            .title("t")
            .icon("/icon.png")
            .description("d")
            .handler(noop_handler())
            .build()
            .unwrap_err();

        assert!(matches!(err, DefinitionError::NoActions));
    }

    #[test]
    fn test_missing_handler_is_rejected() {
        let err = complete_builder()
            .build()
            .unwrap_err();

        assert_eq!(err.to_string(), "Action definition is missing a handler");
    }

    #[test]
    fn test_duplicate_parameter_is_rejected() {
        let err = ActionDefinition::builder()
            .title("t")
            .icon("/icon.png")
            .description("d")
            .linked_action(
                LinkedActionBuilder::new("Send", "/api/send?to={to}")
                    .parameter(ParameterBuilder::address("to"))
                    .parameter(ParameterBuilder::text("to")),
            )
            .handler(noop_handler())
            .build()
            .unwrap_err();

        assert_eq!(err.to_string(), "Duplicate parameter `to` in linked action `Send`");
    }

    #[test]
    fn test_invalid_metadata_is_rejected() {
        let err = ActionDefinition::builder()
            .title("t")
            .icon("icon.png")
            .description("d")
            .linked_action(
                LinkedActionBuilder::new("Pick", "/api/pick?c={choice}")
                    .parameter(ParameterBuilder::radio("choice")),
            )
            .handler(noop_handler())
            .build()
            .unwrap_err();

        let DefinitionError::InvalidMetadata(schema) = err else {
            panic!("expected invalid metadata, got {err:?}");
        };
        let paths: Vec<_> = schema
            .issues()
            .iter()
            .map(|issue| issue.path.as_str())
            .collect();
        assert_eq!(paths, vec!["icon", "links.actions[0].parameters[0].options"]);
    }

    #[test]
    fn test_unmatched_placeholder_is_allowed() {
        let metadata = ActionDefinition::builder()
            .title("t")
            .icon("/icon.png")
            .description("d")
            .linked_action(LinkedActionBuilder::new("Go", "/api/go/{id}"))
            .build_metadata()
            .unwrap();

        assert_eq!(metadata.linked_actions()[0].href, "/api/go/{id}");
    }

    #[test]
    fn test_parameter_builder_drops_options_of_plain_types() {
        let param = ParameterBuilder::text("memo")
            .option("a", "a")
            .build();

        assert_eq!(
            param,
            TypedActionParameter::Plain(ActionParameter::new(ParameterType::Text, "memo"))
        );
    }
}
