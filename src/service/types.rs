use crate::error::Result;
use std::collections::HashSet;

/// Outcome of one background facade call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Inserted {
        key: String,
        value: Vec<u8>,
        result: Result<()>,
    },
    Removed {
        key: String,
        value: Vec<u8>,
        result: Result<()>,
    },
    Retrieved {
        key: String,
        result: Result<HashSet<Vec<u8>>>,
    },
}

impl Completion {
    pub fn key(&self) -> &str {
        match self {
            Completion::Inserted { key, .. }
            | Completion::Removed { key, .. }
            | Completion::Retrieved { key, .. } => key,
        }
    }

    pub fn is_ok(&self) -> bool {
        match self {
            Completion::Inserted { result, .. } | Completion::Removed { result, .. } => {
                result.is_ok()
            }
            Completion::Retrieved { result, .. } => result.is_ok(),
        }
    }
}
