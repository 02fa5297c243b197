use std::{collections::HashMap, future::Future};

use async_trait::async_trait;
#[cfg(feature = "test-utils")]
use mockall::automock;

use crate::{
    dto::{TransactionRequest, TransactionResponse},
    parameter::ParameterValue,
};

/// What a handler gets to see of an incoming transaction request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionContext {
    pub account: String,
    pub action: Option<String>,
    pub input: Option<String>,
    pub data: HashMap<String, ParameterValue>,
}

impl From<TransactionRequest> for ActionContext {
    fn from(request: TransactionRequest) -> Self {
        Self {
            account: request.account,
            action: request.action,
            input: request.input,
            data: request.data.unwrap_or_default(),
        }
    }
}

/// Business logic turning a validated request into transactions.
///
/// Errors are reported to the caller unchanged. Use [`handler_fn`] to turn an async closure into
/// a handler.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, context: ActionContext) -> anyhow::Result<TransactionResponse>;
}

/// An [`ActionHandler`] backed by a closure. Created with [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(ActionContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<TransactionResponse>> + Send,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> ActionHandler for HandlerFn<F>
where
    F: Fn(ActionContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<TransactionResponse>> + Send,
{
    async fn handle(&self, context: ActionContext) -> anyhow::Result<TransactionResponse> {
        (self.f)(context).await
    }
}
