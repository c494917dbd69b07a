//! Request body decoding.

use lead_types::{IntakeError, RawSubmission, GENERIC_BAD_REQUEST};
use serde_json::Value;

/// Decodes a submission body of at most `max_bytes` bytes.
///
/// Anything but a non-empty JSON object is rejected with a generic 400.
pub fn parse_submission(body: &[u8], max_bytes: usize) -> Result<RawSubmission, IntakeError> {
	if body.len() > max_bytes {
		return Err(IntakeError::bad_request(GENERIC_BAD_REQUEST));
	}

	let value: Value = serde_json::from_slice(body)
		.map_err(|_| IntakeError::bad_request(GENERIC_BAD_REQUEST))?;

	if !value.is_object() {
		return Err(IntakeError::bad_request(GENERIC_BAD_REQUEST));
	}

	serde_json::from_value(value).map_err(|_| IntakeError::bad_request(GENERIC_BAD_REQUEST))
}
