//! Process environment mirror for secret fields

/// Set or clear an environment variable
///
/// Callers hold the manager's commit lock, so the manager never writes the
/// environment from two threads at once.
#[allow(unsafe_code)]
pub(crate) fn set_env(key: &str, value: Option<&str>) {
	match value {
		// SAFETY: env writes are serialized by the commit lock; keys are
		// validated `[A-Za-z_][A-Za-z0-9_]*` and values are NUL-free.
		Some(value) => unsafe { std::env::set_var(key, value) },
		// SAFETY: as above.
		None => unsafe { std::env::remove_var(key) },
	}
}

// vim: ts=4
