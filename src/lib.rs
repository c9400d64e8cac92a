//! # DAEDALUS Shell Library
//!
//! `daedalus-shell` is a desktop front end for the DAEDALUS DNA-origami design engine.
//! It collects a project name, a helical form, a number of helical turns and two input
//! files, then asks the engine to run its `calc` operation over XML-RPC.
//!
//! - `controller`: the shell side, owning the selected files and relaying page requests.
//! - `view`: the page side, rendering the form and running the engine call.
//! - `helper`: XML-RPC codec and client, native file dialogs, window lifecycle and the
//!   single-instance control channel.
//!
//! The routing and sequence design itself happens inside the engine; this crate only
//! passes file paths along.

pub mod batch;
pub mod config;
pub mod controller;
pub mod error;
pub mod helper;
pub mod message;
pub mod session;
pub mod view;
