//! Scoped gate for signomial (non-log-convex) construction.
//!
//! Negation, subtraction, and non-positive coefficients are only legal while
//! a [`SignomialsEnabled`] guard is alive. The guard is an RAII token over a
//! thread-local depth counter, so the gate is restored on every exit path,
//! including panics, and guards nest.

use std::cell::Cell;

thread_local! {
    static DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// RAII guard enabling signomial construction for its lifetime.
///
/// # Example
///
/// ```
/// use posyforge_core::sigscope::SignomialsEnabled;
///
/// assert!(!SignomialsEnabled::active());
/// {
///     let _guard = SignomialsEnabled::new();
///     assert!(SignomialsEnabled::active());
/// }
/// assert!(!SignomialsEnabled::active());
/// ```
#[derive(Debug)]
pub struct SignomialsEnabled(());

impl SignomialsEnabled {
    /// Enters a signomials-enabled scope.
    #[allow(clippy::new_without_default)]
    pub fn new() -> SignomialsEnabled {
        DEPTH.with(|d| d.set(d.get() + 1));
        SignomialsEnabled(())
    }

    /// Returns true if any signomials-enabled scope is live on this thread.
    pub fn active() -> bool {
        DEPTH.with(|d| d.get() > 0)
    }
}

impl Drop for SignomialsEnabled {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_nest() {
        assert!(!SignomialsEnabled::active());
        let outer = SignomialsEnabled::new();
        {
            let _inner = SignomialsEnabled::new();
            assert!(SignomialsEnabled::active());
        }
        assert!(SignomialsEnabled::active());
        drop(outer);
        assert!(!SignomialsEnabled::active());
    }

    #[test]
    fn restored_after_panic() {
        let result = std::panic::catch_unwind(|| {
            let _guard = SignomialsEnabled::new();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!SignomialsEnabled::active());
    }
}
