//! The state/message pair every stage reports back across its boundary.
//!
//! States follow HTTP semantics, which is what the task queue expects in
//! its callback payload.

use serde::{Deserialize, Serialize};

pub const STATE_OK: u16 = 200;
pub const STATE_FORBIDDEN: u16 = 403;
pub const STATE_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub state: u16,
    pub message: String,
}

impl Status {
    pub fn new(state: u16, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(STATE_OK, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(STATE_ERROR, message)
    }

    pub fn is_success(&self) -> bool {
        self.state == STATE_OK
    }
}
