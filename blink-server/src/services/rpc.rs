//! HTTP handlers of the action endpoints.
use std::{collections::HashMap, sync::Arc};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use blink_common::{dto::ActionError, validation::SchemaValidationError};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::runtime::{ActionRuntime, RuntimeError};

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Action `{0}` not found")]
    NotFound(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ResponseError for RpcError {
    fn status_code(&self) -> StatusCode {
        match self {
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::Runtime(RuntimeError::Validation(_) | RuntimeError::Dispatch(_)) => {
                StatusCode::BAD_REQUEST
            }
            RpcError::Runtime(RuntimeError::Handler(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ActionError::new(self.to_string()))
    }
}

/// Runtimes served by the HTTP services, keyed by the last path segment of their endpoint.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<ActionRuntime>>,
}

impl ActionRegistry {
    pub fn register(&mut self, name: &str, runtime: ActionRuntime) {
        self.actions
            .insert(name.to_string(), Arc::new(runtime));
    }

    pub fn get(&self, name: &str) -> Result<Arc<ActionRuntime>, RpcError> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| RpcError::NotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// `GET /{prefix}/{name}`
#[instrument(skip(registry))]
pub async fn describe(
    registry: web::Data<ActionRegistry>,
    name: web::Path<String>,
) -> Result<HttpResponse, RpcError> {
    let runtime = registry.get(&name)?;
    Ok(HttpResponse::Ok().json(runtime.describe()))
}

/// `POST /{prefix}/{name}`
///
/// The body is parsed here rather than by an extractor so malformed JSON is reported with the
/// same error payload as any other invalid request.
#[instrument(skip(registry, body))]
pub async fn execute(
    registry: web::Data<ActionRegistry>,
    name: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, RpcError> {
    let runtime = registry.get(&name)?;
    let body: Value = serde_json::from_slice(&body)
        .map_err(|err| RuntimeError::Validation(SchemaValidationError::from(err)))?;

    match runtime.handle_request(&body).await {
        Ok(response) => {
            info!("Transaction request handled");
            Ok(HttpResponse::Ok().json(response))
        }
        Err(err) => {
            error!(error = %err, "Error while handling transaction request.");
            Err(err.into())
        }
    }
}

/// `OPTIONS /{prefix}/{name}`, the CORS headers are added by the app wide middleware.
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}
