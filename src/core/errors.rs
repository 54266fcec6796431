// src/core/errors.rs

//! Defines the primary error type for the control subsystem.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all failures the control protocol can surface.
/// Mirrors the wire-protocol error taxonomy: protocol, parse, resource, subsystem,
/// and fast-reload errors each get their own variants so the dispatcher's mapping to
/// `error <reason>\n` text is a single `match`, never ad hoc formatting in handlers.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("TLS error: {0}")]
    Tls(String),

    // --- Protocol errors (close without reply, or short error then close) ---
    #[error("bad magic")]
    BadMagic,

    #[error("unsupported protocol version")]
    UnsupportedVersion,

    #[error("command line too long")]
    LineTooLong,

    #[error("NOAUTH client certificate required")]
    AuthRequired,

    // --- Parse errors (single error line, connection remains open) ---
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("syntax error")]
    SyntaxError,

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("malformed domain name '{0}'")]
    MalformedName(String),

    #[error("malformed resource record '{0}'")]
    MalformedRecord(String),

    // --- Resource errors ---
    #[error("out of memory")]
    OutOfMemory,

    #[error("{path} failed: {reason}")]
    PathFailed { path: String, reason: String },

    // --- Subsystem errors ---
    #[error("no such zone '{0}'")]
    NoSuchZone(String),

    #[error("zone '{0}' has no contents")]
    ZoneEmpty(String),

    #[error("no such view '{0}'")]
    NoSuchView(String),

    #[error("{0}")]
    Subsystem(String),

    // --- Fast-reload errors ---
    #[error("config read '{path}' failed: {reason}")]
    ConfigReadFailed { path: String, reason: String },

    #[error("reload construct failed: {0}")]
    ConstructFailed(String),

    #[error("reload IPC failed: {0}")]
    IpcFailed(String),

    // --- Internal ---
    #[error("internal error: {0}")]
    Internal(String),
}

impl Clone for ControlError {
    fn clone(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(Arc::clone(e)),
            Self::Tls(s) => Self::Tls(s.clone()),
            Self::BadMagic => Self::BadMagic,
            Self::UnsupportedVersion => Self::UnsupportedVersion,
            Self::LineTooLong => Self::LineTooLong,
            Self::AuthRequired => Self::AuthRequired,
            Self::UnknownCommand(s) => Self::UnknownCommand(s.clone()),
            Self::SyntaxError => Self::SyntaxError,
            Self::UnknownOption(s) => Self::UnknownOption(s.clone()),
            Self::MalformedName(s) => Self::MalformedName(s.clone()),
            Self::MalformedRecord(s) => Self::MalformedRecord(s.clone()),
            Self::OutOfMemory => Self::OutOfMemory,
            Self::PathFailed { path, reason } => Self::PathFailed {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::NoSuchZone(s) => Self::NoSuchZone(s.clone()),
            Self::ZoneEmpty(s) => Self::ZoneEmpty(s.clone()),
            Self::NoSuchView(s) => Self::NoSuchView(s.clone()),
            Self::Subsystem(s) => Self::Subsystem(s.clone()),
            Self::ConfigReadFailed { path, reason } => Self::ConfigReadFailed {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ConstructFailed(s) => Self::ConstructFailed(s.clone()),
            Self::IpcFailed(s) => Self::IpcFailed(s.clone()),
            Self::Internal(s) => Self::Internal(s.clone()),
        }
    }
}

impl PartialEq for ControlError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Io(a), Self::Io(b)) => a.to_string() == b.to_string(),
            (Self::Tls(a), Self::Tls(b)) => a == b,
            (Self::UnknownCommand(a), Self::UnknownCommand(b)) => a == b,
            (Self::UnknownOption(a), Self::UnknownOption(b)) => a == b,
            (Self::MalformedName(a), Self::MalformedName(b)) => a == b,
            (Self::MalformedRecord(a), Self::MalformedRecord(b)) => a == b,
            (Self::NoSuchZone(a), Self::NoSuchZone(b)) => a == b,
            (Self::ZoneEmpty(a), Self::ZoneEmpty(b)) => a == b,
            (Self::NoSuchView(a), Self::NoSuchView(b)) => a == b,
            (Self::Subsystem(a), Self::Subsystem(b)) => a == b,
            (Self::ConstructFailed(a), Self::ConstructFailed(b)) => a == b,
            (Self::IpcFailed(a), Self::IpcFailed(b)) => a == b,
            (Self::Internal(a), Self::Internal(b)) => a == b,
            (
                Self::PathFailed { path: p1, reason: r1 },
                Self::PathFailed { path: p2, reason: r2 },
            ) => p1 == p2 && r1 == r2,
            (
                Self::ConfigReadFailed { path: p1, reason: r1 },
                Self::ConfigReadFailed { path: p2, reason: r2 },
            ) => p1 == p2 && r1 == r2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl From<std::io::Error> for ControlError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Arc::new(e))
    }
}

impl From<toml::de::Error> for ControlError {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigReadFailed {
            path: String::new(),
            reason: e.to_string(),
        }
    }
}

impl ControlError {
    /// Renders the wire-protocol reply line for this error, per SPEC_FULL §4.2/§7.
    /// Protocol-class errors (bad magic, auth) are never rendered — those close
    /// the connection without a reply.
    pub fn to_wire_line(&self) -> String {
        format!("error {self}\n")
    }

    /// True for errors that close the connection without writing any reply bytes.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::BadMagic | Self::UnsupportedVersion)
    }
}
