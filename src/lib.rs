//! FridgeChef: photo of a fridge in, recipe suggestions out.
//!
//! Two model-backed stages ([`flows`]) sit behind stateless handlers
//! ([`actions`]), which the HTTP layer ([`routes`]) and the client-side
//! workflow ([`orchestrator`]) both call.

pub mod actions;
pub mod config;
pub mod encoder;
pub mod flows;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod routes;
