//! Backend and client-session library for browser voice sessions against a
//! hosted realtime speech model.
//!
//! ## Modules:
//! - **config**: Application configuration (TOML files + environment variables)
//! - **state**: Shared application state and metrics
//! - **health**: Health and metrics endpoints
//! - **middleware**: Request logging and per-endpoint metrics
//! - **handlers**: The credential relay endpoint (`POST /session`)
//! - **rooms**: Room membership registry and its websocket actor
//! - **realtime**: The voice-session state machine with its WebRTC,
//!   signaling, and media implementations
//! - **error**: Custom error types and HTTP error responses

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod realtime;
pub mod rooms;
pub mod state;
