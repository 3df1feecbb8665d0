//! # Yatube Core
//!
//! The domain layer of the Yatube blog: entities, ports, form validation and
//! pagination. Nothing in here knows about HTTP or a concrete database.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;

pub use error::RepoError;
pub use forms::FormErrors;
pub use pagination::{Page, PageWindow, Paginator};
