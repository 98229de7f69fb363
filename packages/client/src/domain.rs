//! Domain logic for client-side operations.
//!
//! Pure functions deciding how the client reacts to a failed session.

use crate::error::ClientError;

/// Check if the client should exit immediately based on the error type.
///
/// Unknown user (401), unauthorized (403), missing room (404) and an already
/// connected member (409) will not change by retrying.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::Rejected(401 | 403 | 404 | 409))
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The number of failed sessions so far
/// * `max_attempts` - The maximum number of connection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}
