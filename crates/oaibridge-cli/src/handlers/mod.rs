//! Command handlers.
//!
//! Handlers follow the pattern `pub async fn execute(config: BridgeConfig) -> Result<()>`:
//! they wire the backend client and run one command to completion.

pub mod check;
pub mod serve;
