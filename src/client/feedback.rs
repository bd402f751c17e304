use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

/// Short user-facing notice about the outcome of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: ToastKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: ToastKind::Error, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { kind: ToastKind::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { kind: ToastKind::Warning, message: message.into() }
    }

    /// Success message on `Ok`, the error's own message otherwise
    pub fn from_result<T, E: fmt::Display>(result: &Result<T, E>, success: &str) -> Self {
        match result {
            Ok(_) => Self::success(success),
            Err(err) => Self::error(err.to_string()),
        }
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            ToastKind::Success => "ok",
            ToastKind::Error => "erro",
            ToastKind::Info => "info",
            ToastKind::Warning => "aviso",
        };
        write!(f, "[{}] {}", label, self.message)
    }
}
