//! `gcloud auth print-access-token` fallback.

use std::time::Duration;

use tracing::{debug, instrument};
use vtx_core::AccessToken;
use vtx_fetch::ProcessRunner;

use super::error::GoogleAuthError;

/// CLI binary name.
pub const GCLOUD: &str = "gcloud";

const PRINT_TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifetime assumed for a token printed by gcloud.
const ASSUMED_LIFETIME_MINS: i64 = 60;

/// True if `gcloud` is on PATH.
pub fn is_available(process: &ProcessRunner) -> bool {
    process.command_exists(GCLOUD)
}

/// Asks the gcloud CLI for an access token.
#[instrument(skip(process))]
pub async fn print_access_token(process: &ProcessRunner) -> Result<AccessToken, GoogleAuthError> {
    debug!("Getting token from gcloud CLI");

    let output = process
        .run_with_timeout(GCLOUD, &["auth", "print-access-token"], PRINT_TOKEN_TIMEOUT)
        .await?;
    let token = output.stdout_if_success()?.trim();

    if token.is_empty() {
        return Err(GoogleAuthError::EmptyToken);
    }

    Ok(AccessToken::expiring_in(
        token,
        chrono::Duration::minutes(ASSUMED_LIFETIME_MINS),
    ))
}
