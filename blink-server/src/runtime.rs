//! Server side answer to the two operations of an action endpoint: describing the action and
//! handling transaction requests.
use blink_common::{
    builder::ActionDefinition,
    dto::{ActionMetadata, TransactionRequest, TransactionResponse, INPUT_ACTION},
    validation::{validate_transaction_request, SchemaValidationError},
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RequestDispatchError {
    #[error("No action matches `{0}`")]
    UnknownAction(String),

    #[error("Input is required for action `{0}`")]
    MissingInput(String),
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    #[error(transparent)]
    Dispatch(#[from] RequestDispatchError),

    /// The handler failed; its message is passed through unchanged.
    #[error("{0}")]
    Handler(anyhow::Error),
}

/// Stateless runtime of a single action definition.
#[derive(Debug, Clone)]
pub struct ActionRuntime {
    definition: ActionDefinition,
}

impl ActionRuntime {
    pub fn new(definition: ActionDefinition) -> Self {
        Self { definition }
    }

    pub fn describe(&self) -> &ActionMetadata {
        self.definition.metadata()
    }

    /// Validates `body` as a transaction request, resolves the selected legacy action and
    /// passes the request to the handler.
    ///
    /// The handler's response is returned as is.
    #[instrument(skip_all, fields(title = %self.describe().title))]
    pub async fn handle_request(&self, body: &Value) -> Result<TransactionResponse, RuntimeError> {
        let request = validate_transaction_request(body)?;
        self.dispatch(&request)?;
        debug!(account = %request.account, action = ?request.action, "Dispatching request");

        self.definition
            .handler()
            .handle(request.into())
            .await
            .map_err(|err| {
                warn!(error = %err, "Action handler failed");
                RuntimeError::Handler(err)
            })
    }

    /// Matches the request against the legacy vocabulary.
    ///
    /// Requests for an action that is neither a button value nor [`INPUT_ACTION`] are rejected
    /// when only legacy actions are offered. With linked actions present they are passed through
    /// as resolved hrefs. Requests without an action always pass.
    fn dispatch(&self, request: &TransactionRequest) -> Result<(), RequestDispatchError> {
        let metadata = self.describe();
        let Some(action) = request.action.as_deref() else {
            return Ok(());
        };
        if metadata.actions.is_empty() {
            return Ok(());
        }

        let matched = metadata
            .actions
            .iter()
            .find(|entry| {
                if action == INPUT_ACTION {
                    entry.is_input()
                } else {
                    !entry.is_input() && entry.value.as_deref() == Some(action)
                }
            });

        match matched {
            Some(entry) if entry.is_input() => {
                if request
                    .input
                    .as_deref()
                    .is_some_and(|input| !input.trim().is_empty())
                {
                    Ok(())
                } else {
                    Err(RequestDispatchError::MissingInput(entry.label.clone()))
                }
            }
            Some(_) => Ok(()),
            None if !metadata.linked_actions().is_empty() => Ok(()),
            None => Err(RequestDispatchError::UnknownAction(action.to_string())),
        }
    }
}
