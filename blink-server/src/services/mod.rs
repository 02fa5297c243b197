//! This module contains the HTTP services exposing action endpoints
use actix_web::{
    dev::ServerHandle,
    http::{header, Method},
    middleware, web, App, HttpServer,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

use crate::runtime::ActionRuntime;

mod rpc;

pub use rpc::{ActionRegistry, RpcError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No action registered")]
    NoActions,

    #[error("Failed to start server: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Server stopped unexpectedly: {0}")]
    Server(String),
}

/// Helper struct to build the action HTTP server.
pub struct ServicesBuilder {
    prefix: String,
    port: u16,
    bind: String,
    registry: ActionRegistry,
}

impl Default for ServicesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServicesBuilder {
    pub fn new() -> Self {
        Self {
            prefix: "api/actions".to_owned(),
            port: 4242,
            bind: "0.0.0.0".to_owned(),
            registry: ActionRegistry::default(),
        }
    }

    /// Sets the URL prefix for the endpoints
    pub fn prefix(mut self, v: &str) -> Self {
        v.trim_matches('/')
            .clone_into(&mut self.prefix);
        self
    }

    /// Sets the IP address for the server
    pub fn bind(mut self, v: &str) -> Self {
        v.clone_into(&mut self.bind);
        self
    }

    /// Sets the port for the server
    pub fn port(mut self, v: u16) -> Self {
        self.port = v;
        self
    }

    /// Serves `runtime` under `/{prefix}/{name}`. Registering a name twice replaces the earlier
    /// runtime.
    pub fn register_action(mut self, name: &str, runtime: ActionRuntime) -> Self {
        self.registry.register(name, runtime);
        self
    }

    /// Starts the server. Returns a tuple containing a handle for the server and a Tokio handle
    /// for the server task.
    pub fn run(self) -> Result<(ServerHandle, JoinHandle<Result<(), ServiceError>>), ServiceError> {
        if self.registry.is_empty() {
            return Err(ServiceError::NoActions);
        }
        for name in self.registry.names() {
            info!(endpoint = %format!("/{}/{}", self.prefix, name), "Serving action");
        }

        let registry = web::Data::new(self.registry);
        let prefix = self.prefix;
        let server = HttpServer::new(move || {
            App::new()
                .wrap(cors_headers())
                .configure(configure_routes(registry.clone(), &prefix))
        })
        .keep_alive(std::time::Duration::from_secs(60))
        .bind((self.bind.as_str(), self.port))
        .map_err(ServiceError::Bind)?
        .run();

        info!(bind = %self.bind, port = self.port, "Starting action server");
        let handle = server.handle();
        let task = tokio::spawn(async move {
            server
                .await
                .map_err(|err| ServiceError::Server(err.to_string()))
        });
        Ok((handle, task))
    }
}

/// Every response, errors included, is readable cross-origin.
pub(crate) fn cors_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .add((header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"))
        .add((header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"))
}

pub(crate) fn configure_routes(
    registry: web::Data<ActionRegistry>,
    prefix: &str,
) -> impl FnOnce(&mut web::ServiceConfig) {
    let path = format!("/{}/{{name}}", prefix);
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(registry).service(
            web::resource(path)
                .route(web::get().to(rpc::describe))
                .route(web::post().to(rpc::execute))
                .route(web::method(Method::OPTIONS).to(rpc::preflight)),
        );
    }
}
