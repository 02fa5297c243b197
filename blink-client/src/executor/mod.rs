//! # Action Executor
//!
//! Client side controller of a single action. It fetches and validates the action metadata,
//! resolves the wallet account, submits transaction requests, validates the responses and hands
//! the resulting transactions to the wallet one after the other.
//!
//! Metadata refreshes are mutually exclusive: starting a refresh cancels the one in flight and a
//! cancelled refresh never writes state. An execution cannot be cancelled once started.
//! Transactions already broadcast when a later one fails are not rolled back.
use std::sync::Arc;

use blink_common::{
    build_href,
    dto::{
        ActionMetadata, LinkedAction, LinkedActionType, NextActionLink, NextActionRequest,
        TransactionRequest,
    },
    validation::{
        validate_action_metadata, validate_parameter_values, validate_transaction_response,
        ParameterValidationError, SchemaValidationError, Validate,
    },
    ParameterValues,
};
use thiserror::Error;
use tokio::{select, sync::Mutex, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use self::state::{ExecutionState, ExecutorSnapshot};
use crate::{
    config::ExecutorConfig,
    rpc::{ActionClient, RPCError},
    wallet::{WalletAdapter, WalletError},
};

mod state;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to resolve URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Action cannot be executed while {0}")]
    NotReady(ExecutionState),

    #[error("Action is disabled")]
    Disabled,

    #[error(transparent)]
    Parameters(#[from] ParameterValidationError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Network(#[from] RPCError),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(SchemaValidationError),

    #[error("Invalid response: {0}")]
    InvalidResponse(SchemaValidationError),

    #[error("No transaction found in response")]
    NoTransaction,
}

/// Result of a successful execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// All transactions were broadcast.
    Completed {
        /// Hash of the last transaction.
        hash: String,
        message: Option<String>,
        next_action: Option<ActionMetadata>,
    },
    /// An external link action resolved to this URL. Nothing was submitted.
    ExternalLink(String),
}

type SuccessCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// The single outstanding metadata fetch.
#[derive(Default)]
struct FetchSlot {
    generation: u64,
    token: CancellationToken,
}

struct Submission {
    account: String,
    hash: String,
    message: Option<String>,
    next: Option<NextActionLink>,
}

pub struct ActionExecutor<C, W> {
    endpoint: Url,
    client: Arc<C>,
    wallet: Arc<W>,
    config: ExecutorConfig,
    shared: Arc<Mutex<ExecutorSnapshot>>,
    fetch: Arc<Mutex<FetchSlot>>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

// Default derive(Clone) would require C and W to be Clone as well.
impl<C, W> Clone for ActionExecutor<C, W> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            client: self.client.clone(),
            wallet: self.wallet.clone(),
            config: self.config.clone(),
            shared: self.shared.clone(),
            fetch: self.fetch.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<C, W> ActionExecutor<C, W>
where
    C: ActionClient,
    W: WalletAdapter,
{
    pub fn new(
        endpoint: &str,
        client: C,
        wallet: W,
        config: ExecutorConfig,
    ) -> Result<Self, ExecutionError> {
        let endpoint = endpoint
            .parse::<Url>()
            .map_err(|e| ExecutionError::InvalidUrl {
                url: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            endpoint,
            client: Arc::new(client),
            wallet: Arc::new(wallet),
            config,
            shared: Arc::new(Mutex::new(ExecutorSnapshot::default())),
            fetch: Arc::new(Mutex::new(FetchSlot::default())),
            on_success: None,
            on_error: None,
        })
    }

    /// Called with the final transaction hash and the executed action identifier.
    pub fn with_on_success(
        mut self,
        callback: impl Fn(&str, &str) + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Called with the error message whenever an execution fails.
    pub fn with_on_error(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn state(&self) -> ExecutionState {
        self.shared.lock().await.state
    }

    pub async fn snapshot(&self) -> ExecutorSnapshot {
        self.shared.lock().await.clone()
    }

    /// Resolves a possibly relative href against the action endpoint.
    pub fn resolve_url(&self, href: &str) -> Result<Url, ExecutionError> {
        self.endpoint
            .join(href)
            .map_err(|e| ExecutionError::InvalidUrl {
                url: href.to_string(),
                reason: e.to_string(),
            })
    }

    /// Fetches and validates the action metadata.
    ///
    /// Moves to `loading` and then to `ready` or `error`. While an execution is running or has
    /// succeeded the metadata is updated in the background and the state is left untouched. A
    /// refresh superseded by a newer one returns `Ok(())` without writing anything.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn refresh(&self) -> Result<(), ExecutionError> {
        let (generation, token) = {
            let mut slot = self.fetch.lock().await;
            slot.token.cancel();
            slot.token = CancellationToken::new();
            slot.generation += 1;

            let mut shared = self.shared.lock().await;
            if !matches!(shared.state, ExecutionState::Executing | ExecutionState::Success) {
                shared.state = ExecutionState::Loading;
            }
            (slot.generation, slot.token.clone())
        };

        let result = select! {
            _ = token.cancelled() => {
                debug!(generation, "Metadata fetch superseded");
                return Ok(());
            }
            result = self.fetch_metadata() => result,
        };

        let slot = self.fetch.lock().await;
        if slot.generation != generation {
            debug!(generation, "Discarding result of superseded metadata fetch");
            return Ok(());
        }
        let mut shared = self.shared.lock().await;
        let foreground = shared.state == ExecutionState::Loading;
        match result {
            Ok(metadata) => {
                debug!(title = %metadata.title, "Metadata refreshed");
                shared.metadata = Some(metadata);
                if foreground {
                    shared.state = ExecutionState::Ready;
                    shared.error = None;
                }
                Ok(())
            }
            Err(err) if foreground => {
                warn!(error = %err, "Failed to load metadata");
                shared.state = ExecutionState::Error;
                shared.error = Some(err.to_string());
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, "Background metadata refresh failed");
                Err(err)
            }
        }
    }

    async fn fetch_metadata(&self) -> Result<ActionMetadata, ExecutionError> {
        let body = self
            .client
            .get_metadata(self.endpoint.as_str())
            .await?;
        validate_action_metadata(&body).map_err(ExecutionError::InvalidMetadata)
    }

    /// Refreshes the metadata now and then on every configured interval until the returned
    /// handle is aborted.
    pub fn spawn_refresh_loop(&self) -> JoinHandle<()>
    where
        C: 'static,
        W: 'static,
    {
        let executor = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(executor.config.refresh_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(err) = executor.refresh().await {
                    debug!(error = %err, "Scheduled refresh failed");
                }
            }
        })
    }

    /// Submits `action` and signs the returned transactions in order.
    ///
    /// `action` is a legacy button value, `__input__`, or a resolved linked action href.
    /// Only allowed from `ready`; ends in `success` or `error`.
    #[instrument(skip(self, input, data))]
    pub async fn execute(
        &self,
        action: &str,
        input: Option<String>,
        data: Option<ParameterValues>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        self.begin_execution().await?;
        info!("Executing action");

        let submission = match self.submit(action, input, data).await {
            Ok(submission) => submission,
            Err(err) => {
                let message = err.to_string();
                warn!(error = %message, "Execution failed");
                {
                    let mut shared = self.shared.lock().await;
                    shared.state = ExecutionState::Error;
                    shared.error = Some(message.clone());
                }
                if let Some(callback) = &self.on_error {
                    callback(&message);
                }
                return Err(err);
            }
        };

        let next_action = match submission.next {
            Some(link) => {
                self.resolve_next_action(&submission.account, &submission.hash, link)
                    .await
            }
            None => None,
        };

        {
            let mut shared = self.shared.lock().await;
            shared.state = ExecutionState::Success;
            shared.last_hash = Some(submission.hash.clone());
            shared.message = submission.message.clone();
            shared.next_action = next_action.clone();
        }
        info!(hash = %submission.hash, "Execution succeeded");
        if let Some(callback) = &self.on_success {
            callback(&submission.hash, action);
        }

        Ok(ExecutionOutcome::Completed {
            hash: submission.hash,
            message: submission.message,
            next_action,
        })
    }

    /// Validates `values` against the parameters of `action`, resolves its href and executes it.
    ///
    /// Invalid values are reported without any state change so they can be corrected. External
    /// links are resolved and returned without contacting the server or the wallet.
    pub async fn execute_linked(
        &self,
        action: &LinkedAction,
        values: ParameterValues,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        if self
            .shared
            .lock()
            .await
            .metadata
            .as_ref()
            .is_some_and(|metadata| metadata.disabled)
        {
            return Err(ExecutionError::Disabled);
        }
        validate_parameter_values(&action.parameters, &values)?;
        let href = build_href(&action.href, &values);

        if action.kind == LinkedActionType::ExternalLink {
            let url = self.resolve_url(&href)?;
            debug!(%url, "Resolved external link");
            return Ok(ExecutionOutcome::ExternalLink(url.into()));
        }

        let data = (!values.is_empty()).then_some(values);
        self.execute(&href, None, data)
            .await
    }

    /// Clears `success` or `error` without refetching metadata.
    pub async fn reset(&self) {
        let mut shared = self.shared.lock().await;
        if matches!(shared.state, ExecutionState::Success | ExecutionState::Error) {
            shared.state = if shared.metadata.is_some() {
                ExecutionState::Ready
            } else {
                ExecutionState::Idle
            };
            shared.error = None;
        }
    }

    async fn begin_execution(&self) -> Result<(), ExecutionError> {
        let mut shared = self.shared.lock().await;
        if shared.state != ExecutionState::Ready {
            return Err(ExecutionError::NotReady(shared.state));
        }
        if shared
            .metadata
            .as_ref()
            .is_some_and(|metadata| metadata.disabled)
        {
            return Err(ExecutionError::Disabled);
        }
        shared.state = ExecutionState::Executing;
        shared.error = None;
        shared.message = None;
        shared.next_action = None;
        Ok(())
    }

    async fn resolve_account(&self) -> Result<String, ExecutionError> {
        match self.wallet.address() {
            Some(address) if self.wallet.is_connected() => Ok(address),
            _ => {
                debug!("Wallet not connected, connecting");
                Ok(self.wallet.connect().await?)
            }
        }
    }

    async fn submit(
        &self,
        action: &str,
        input: Option<String>,
        data: Option<ParameterValues>,
    ) -> Result<Submission, ExecutionError> {
        let account = self.resolve_account().await?;
        let request = TransactionRequest {
            account: account.clone(),
            action: Some(action.to_string()),
            input,
            data,
        };
        let body = self
            .client
            .post_transaction(self.endpoint.as_str(), &request)
            .await?;
        let response =
            validate_transaction_response(&body).map_err(ExecutionError::InvalidResponse)?;
        let message = response.message.clone();
        let next = response.next().cloned();

        let mut last_hash = None;
        for (index, transaction) in response
            .into_transactions()
            .iter()
            .enumerate()
        {
            debug!(index, to = %transaction.to, "Signing transaction");
            let hash = self
                .wallet
                .sign_and_send_transaction(transaction)
                .await?;
            self.shared.lock().await.last_hash = Some(hash.clone());
            last_hash = Some(hash);
        }
        let hash = last_hash.ok_or(ExecutionError::NoTransaction)?;

        Ok(Submission { account, hash, message, next })
    }

    /// Failing to resolve the next action never fails the execution that returned it.
    async fn resolve_next_action(
        &self,
        account: &str,
        signature: &str,
        link: NextActionLink,
    ) -> Option<ActionMetadata> {
        let result = match link {
            NextActionLink::Inline { action } => action
                .validate()
                .map(|_| *action)
                .map_err(ExecutionError::InvalidMetadata),
            NextActionLink::Post { href } => {
                self.fetch_next_action(account, signature, &href)
                    .await
            }
        };
        result
            .map_err(|err| warn!(error = %err, "Failed to resolve next action"))
            .ok()
    }

    async fn fetch_next_action(
        &self,
        account: &str,
        signature: &str,
        href: &str,
    ) -> Result<ActionMetadata, ExecutionError> {
        let url = self.resolve_url(href)?;
        let request =
            NextActionRequest { account: account.to_string(), signature: signature.to_string() };
        let body = self
            .client
            .post_next_action(url.as_str(), &request)
            .await?;
        validate_action_metadata(&body).map_err(ExecutionError::InvalidMetadata)
    }
}
