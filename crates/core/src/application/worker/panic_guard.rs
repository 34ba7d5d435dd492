// Panic isolation for worker safety
use std::panic::{catch_unwind, UnwindSafe};
use tracing::error;

/// Result of a panic-guarded execution
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Execution completed successfully
    Success(T),
    /// Execution panicked
    Panicked(String),
}

/// Execute a closure with panic isolation
///
/// If the closure panics, the panic is caught and returned as PanicGuardResult::Panicked.
/// Everything the closure owned has already been dropped by unwinding at that point,
/// so a connection moved into it is released exactly once.
///
/// # Example
/// ```text
/// let result = execute_guarded(|| {
///     // This panic will be caught
///     panic!("test panic");
/// });
///
/// match result {
///     PanicGuardResult::Panicked(msg) => {
///         println!("Caught panic: {}", msg);
///     }
///     _ => {}
/// }
/// ```
pub fn execute_guarded<F, T>(f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T + UnwindSafe,
{
    match catch_unwind(f) {
        Ok(result) => PanicGuardResult::Success(result),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };

            error!(panic_msg = %panic_msg, "Connection handler panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_passes_value_through() {
        match execute_guarded(|| 21 * 2) {
            PanicGuardResult::Success(v) => assert_eq!(v, 42),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_str_panic_is_caught() {
        let result = execute_guarded(|| -> u8 { panic!("boom") });
        assert!(matches!(result, PanicGuardResult::Panicked(msg) if msg == "boom"));
    }

    #[test]
    fn test_formatted_panic_is_caught() {
        let code = 7;
        let result = execute_guarded(move || -> u8 { panic!("failed with {}", code) });
        assert!(matches!(result, PanicGuardResult::Panicked(msg) if msg == "failed with 7"));
    }

    #[test]
    fn test_owned_values_dropped_once_on_panic() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct Token(Arc<AtomicUsize>);
        impl Drop for Token {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let token = Token(Arc::clone(&drops));
        let result = execute_guarded(move || {
            let _held = token;
            panic!("mid-request");
        });

        assert!(matches!(result, PanicGuardResult::<()>::Panicked(_)));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
