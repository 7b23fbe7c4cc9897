//! Logging macros over `tracing`.
//!
//! With the `tracing` feature enabled these forward to the `tracing` crate,
//! without it they expand to nothing. Enable with:
//!
//! ```bash
//! cargo test --features tracing
//! ```

#![allow(unused_macros, unused_imports)]

use std::fmt;

#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! info_log {
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! info_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! error_log {
    ($($arg:tt)*) => {
        tracing::error!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! error_log {
    ($($arg:tt)*) => {};
}

/// Abort the process on a broken tree invariant. The tree is shared by
/// every handle, once it is inconsistent no operation can be trusted.
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::logging::abort(format_args!($($arg)+))
    };
}

/// `fatal!` unless `$cond` holds.
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            fatal!($($arg)+)
        }
    };
}

#[cold]
#[inline(never)]
pub(crate) fn abort(args: fmt::Arguments) -> ! {
    error_log!("vebtree invariant violated: {}", args);
    eprintln!("vebtree invariant violated: {}", args);
    std::process::abort()
}
