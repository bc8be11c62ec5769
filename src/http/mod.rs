//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, access log, body limit)
//!     → services::gateway or services::resolver (hop handler)
//!     → Send to client
//! ```

pub mod server;

pub use server::HttpServer;
