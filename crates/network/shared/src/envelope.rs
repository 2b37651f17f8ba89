//! Antwort-Umschlag des Spielservers.
//!
//! Jede Antwort auf eine Anfrage steckt in `{success, message, data}`.
//! Server-Pushes schicken die nackten Datensätze ohne Umschlag.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("server rejected request: {0}")]
    Rejected(String),
    #[error("response carried no data")]
    MissingData,
}

impl<T> ServerResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: String::new(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Entpackt die Nutzdaten, sofern der Server Erfolg gemeldet hat.
    pub fn into_result(self) -> Result<T, ResponseError> {
        if !self.success {
            return Err(ResponseError::Rejected(self.message));
        }
        self.data.ok_or(ResponseError::MissingData)
    }
}
