//! Field sanitation applied to every submitted string.

/// Maximum length, in characters, of each sanitized field.
pub mod limits {
	pub const PARENT: usize = 80;
	pub const PHONE: usize = 32;
	pub const AGE: usize = 8;
	pub const EMAIL: usize = 120;
}

/// Normalizes free-form input before validation.
///
/// Angle brackets are dropped, whitespace and control characters become
/// single spaces, the ends are trimmed and the result is cut to `max_chars`
/// characters. Applying it to its own output changes nothing.
pub fn sanitize(input: &str, max_chars: usize) -> String {
	let cleaned: String = input
		.chars()
		.filter(|c| !matches!(c, '<' | '>'))
		.map(|c| if c.is_control() { ' ' } else { c })
		.collect();

	let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

	match collapsed.char_indices().nth(max_chars) {
		Some((cut, _)) => collapsed[..cut].trim_end().to_string(),
		None => collapsed,
	}
}
