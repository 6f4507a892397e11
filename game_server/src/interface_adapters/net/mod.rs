// Network adapter: WebSocket clients and the shared broadcast serializer.

pub mod client;

pub use client::{broadcast_serializer, ws_handler};
