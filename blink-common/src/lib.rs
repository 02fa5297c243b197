//! Shared building blocks of the action protocol.
//!
//! Producers use [`builder`] to declare actions and [`traits::ActionHandler`] to answer
//! transaction requests. Consumers use [`validation`] to gate everything they receive and
//! [`template`] to resolve linked action hrefs from collected parameter values.
pub mod builder;
pub mod dto;
pub mod parameter;
pub mod share;
pub mod template;
pub mod traits;
pub mod validation;

pub use parameter::{is_selectable_param, ParameterValue, ParameterValues, TypedActionParameter};
pub use template::{build_href, extract_params};
