//! Tracing bootstrap for embedders.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn,pillminder_core=debug,pillminder_store=info";

/// Install a `fmt` subscriber honouring `RUST_LOG`.
///
/// Returns `false` when a global subscriber was already installed, so it is
/// safe to call more than once.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_a_no_op() {
        init_tracing();
        assert!(!init_tracing());
    }
}
