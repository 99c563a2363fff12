use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative stop signal for long corpus runs.
///
/// Clones share the same flag. Builders check it between records, so a
/// cancelled run stops at a record boundary with the last checkpoint intact.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	/// Creates a token that is not cancelled.
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests a stop. Every clone observes it.
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_the_flag() {
		let token = CancellationToken::new();
		let clone = token.clone();
		assert!(!clone.is_cancelled());
		token.cancel();
		assert!(clone.is_cancelled());
	}
}
