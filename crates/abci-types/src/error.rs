//! Structured error payload attached to responses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved codes and codespace used by the protocol core itself.
///
/// Application codes share the numeric space, so the codespace is what
/// distinguishes a core-generated error from an application rejection.
pub mod codes {
    /// Code conventionally meaning success.
    pub const OK: u32 = 0;
    /// Codespace used for every error produced by the protocol core.
    pub const CORE_CODESPACE: &str = "abci";
    /// An out-of-order consensus call or an invalid lifecycle transition.
    pub const PROTOCOL_VIOLATION: u32 = 0xA8C1_0001;
    /// The application handler panicked or its worker vanished.
    pub const INTERNAL_FAULT: u32 = 0xA8C1_0002;
    /// A query asked for a height that is not (or no longer) available.
    pub const HEIGHT_UNAVAILABLE: u32 = 0xA8C1_0003;
}

/// Error fields carried by every response alongside its payload.
///
/// `log` and `info` are advisory and may be non-deterministic; only `code` and
/// `codespace` are meaningful to replicated state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseError {
    /// Error code; zero means success.
    pub code: u32,
    /// Namespace for the code.
    pub codespace: String,
    /// Output of the handler's logger.
    pub log: String,
    /// Additional information.
    pub info: String,
}

impl ResponseError {
    /// Builds an error with the given code and codespace.
    #[must_use]
    pub fn new(code: u32, codespace: impl Into<String>) -> Self {
        Self {
            code,
            codespace: codespace.into(),
            log: String::new(),
            info: String::new(),
        }
    }

    /// Builds a protocol-violation error in the core codespace.
    #[must_use]
    pub fn protocol_violation(log: impl Into<String>) -> Self {
        Self::new(codes::PROTOCOL_VIOLATION, codes::CORE_CODESPACE).with_log(log)
    }

    /// Builds an internal-fault error in the core codespace.
    #[must_use]
    pub fn internal_fault(log: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_FAULT, codes::CORE_CODESPACE).with_log(log)
    }

    /// Builds a height-unavailable error in the core codespace.
    #[must_use]
    pub fn height_unavailable(log: impl Into<String>) -> Self {
        Self::new(codes::HEIGHT_UNAVAILABLE, codes::CORE_CODESPACE).with_log(log)
    }

    /// Replaces the log text.
    #[must_use]
    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    /// Replaces the info text.
    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// Returns `true` when the code signals success.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code == codes::OK
    }

    /// Returns `true` when the error was produced by the protocol core.
    #[must_use]
    pub fn is_core(&self) -> bool {
        self.codespace == codes::CORE_CODESPACE
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.codespace.is_empty() {
            write!(formatter, "code {}", self.code)?;
        } else {
            write!(formatter, "{}/{}", self.codespace, self.code)?;
        }
        if !self.log.is_empty() {
            write!(formatter, ": {}", self.log)?;
        }
        Ok(())
    }
}

impl std::error::Error for ResponseError {}
