use crate::arena::AllocError;
use crate::memory::MemoryError;
use thiserror::Error;

/// 请求字段校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing '{field}' parameter")]
    Missing { field: &'static str },

    #[error("{} must be a {}", capitalize(.field), .expected)]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Coarse classification used by the dispatch surface and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Decode,
    Validation,
    Encode,
    Allocation,
}

/// Guest 端统一错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("Invalid input buffer: {0}")]
    InputRejected(MemoryError),

    #[error("Invalid JSON input")]
    InvalidJson { reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("JSON marshal error: {reason}")]
    Encode { reason: String },

    #[error(transparent)]
    Allocation(#[from] AllocError),
}

impl PluginError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PluginError::InputRejected(_) | PluginError::InvalidJson { .. } => ErrorKind::Decode,
            PluginError::Validation(_) => ErrorKind::Validation,
            PluginError::Encode { .. } => ErrorKind::Encode,
            PluginError::Allocation(_) => ErrorKind::Allocation,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, PluginError>;
