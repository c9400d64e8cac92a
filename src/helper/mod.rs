//! # Helper Module
//!
//! Utility sub-modules used by the shell and the page:
//!
//! - `file_dialog`: native single-file selection behind a trait.
//! - `ioapi`: single-instance control channel between two launches of the app.
//! - `lifecycle`: window creation, reactivation and quit policy.
//! - `rpc_client`: blocking XML-RPC client with timeouts and cancellation.
//! - `xmlrpc`: XML-RPC value model and wire codec.

pub mod file_dialog;
pub mod ioapi;
pub mod lifecycle;
pub mod rpc_client;
pub mod xmlrpc;
