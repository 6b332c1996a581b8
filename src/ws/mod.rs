//! WebSocket transport and room fan-out

pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod protocol;
