//! Wire types shared between the backend and its clients.

pub mod api;
pub mod models;

pub use models::Role;
