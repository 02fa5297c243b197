pub mod cli;
pub mod demo;
pub mod runtime;
pub mod services;

pub use runtime::{ActionRuntime, RequestDispatchError, RuntimeError};
pub use services::{ServiceError, ServicesBuilder};
