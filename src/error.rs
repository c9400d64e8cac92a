//! # Error Handling Module
//!
//! This module defines the error types used throughout the `daedalus-shell` application.
//! Each concern gets its own enum: the XML-RPC codec, the remote call as observed by the
//! page, configuration loading and the single-instance control channel.

use thiserror::Error;

/// Errors produced while encoding a `methodCall` or decoding a `methodResponse`.
#[derive(Error, Debug)]
pub enum XmlRpcError {
    /// The underlying XML reader or writer failed.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Writing the encoded document into its buffer failed.
    #[error("I/O error while writing XML: {0}")]
    Io(#[from] std::io::Error),

    /// Element text was not valid UTF-8.
    #[error("Invalid UTF-8 in XML text")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The document parsed but is not a well-formed XML-RPC message.
    #[error("Malformed XML-RPC message: {0}")]
    Malformed(String),
}

/// Errors surfaced by a remote `calc` call.
///
/// The page only renders "Success!" or "Fail!", but the distinct kinds are kept so
/// the reason for a failure can still be shown next to the status text.
#[derive(Error, Debug)]
pub enum RpcError {
    /// No connection could be made to the engine endpoint.
    #[error("Engine unreachable: {0}")]
    Unreachable(String),

    /// The engine did not answer within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP status {0}")]
    Http(u16),

    /// The engine answered with an XML-RPC fault.
    #[error("Remote fault {code}: {message}")]
    Fault { code: i32, message: String },

    /// The response body could not be decoded as XML-RPC.
    #[error("Malformed response: {0}")]
    Malformed(#[from] XmlRpcError),

    /// The call was cancelled before a reply arrived.
    #[error("Request cancelled")]
    Cancelled,

    /// Any other transport failure reported by the HTTP client.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RpcError::Timeout
        } else if err.is_connect() {
            RpcError::Unreachable(err.to_string())
        } else if let Some(status) = err.status() {
            RpcError::Http(status.as_u16())
        } else {
            RpcError::Transport(err.to_string())
        }
    }
}

/// Errors encountered while loading the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid TOML for [`crate::config::Config`].
    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors on the single-instance control channel.
#[derive(Error, Debug)]
pub enum ControlError {
    /// Socket or connection-file I/O failed.
    #[error("Control channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection file did not contain a usable address.
    #[error("Malformed connection file: {0}")]
    MalformedAddress(String),

    /// A frame arrived without an opcode.
    #[error("Empty control frame")]
    EmptyFrame,

    /// A frame announced a length beyond anything the protocol sends.
    #[error("Control frame too large: {0} bytes")]
    OversizedFrame(usize),

    /// A frame carried an opcode this side does not know.
    #[error("Unknown control opcode: {0}")]
    UnknownOpcode(u8),

    /// The listener thread is gone.
    #[error("Control listener finished")]
    ListenerFinished,
}

/// Errors on the channel between the page and the shell controller thread.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PollEventError {
    /// The controller thread has exited and dropped its end of the channel.
    #[error("Shell thread finished")]
    ThreadFinished,
}
