pub mod client;
pub mod types;

pub use client::{HttpVerificationClient, SharedVerificationClient};
pub use types::{VerificationOutcome, VerificationRequest};
