//! # Yatube Shared
//!
//! Serializable page contexts and error documents produced by the server.

pub mod dto;
pub mod response;

pub use response::{ErrorResponse, Rendered};
