//! API endpoint handlers.

pub mod diagnosis;
pub mod health;
