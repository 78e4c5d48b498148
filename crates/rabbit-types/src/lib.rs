/// Shared types for the Rabbit companion service: identifiers, stored
/// records and the JSON shapes of the HTTP API.
pub mod api;
pub mod ids;
pub mod models;

pub use ids::{ChatId, DEFAULT_CHAT_ID, IdError, Username};
