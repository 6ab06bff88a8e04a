// src/verification/types.rs
use serde::{Deserialize, Serialize};

/// Body sent to the verification endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub discord_id: String,
    pub username: String,
}

/// Answer of the verification endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub success: bool,
}
