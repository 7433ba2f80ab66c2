// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Fila ticket queue.
//!
//! Exposes every queue-engine operation as a REST route plus a Server-Sent
//! Events stream of store change events, so reception desks, attendant
//! stations, the public display, and the dashboard all converge on the same
//! state without polling. Authentication is intentionally absent (out of
//! scope); deploy behind a trusted network boundary.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{GatewayState, ServerConfig, router, start_server};
