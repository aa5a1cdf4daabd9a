//! Logging shim
//!
//! Forwards to `defmt` on target. On the host the macros expand to a
//! borrow of their arguments so call sites compile without `cfg` noise.

#![allow(unused_macros)]

#[cfg(feature = "embedded")]
macro_rules! trace {
    ($($arg:tt)*) => { ::defmt::trace!($($arg)*) };
}

#[cfg(not(feature = "embedded"))]
macro_rules! trace {
    ($fmt:literal $(, $x:expr)* $(,)?) => {{ let _ = ($( &$x, )*); }};
}

#[cfg(feature = "embedded")]
macro_rules! debug {
    ($($arg:tt)*) => { ::defmt::debug!($($arg)*) };
}

#[cfg(not(feature = "embedded"))]
macro_rules! debug {
    ($fmt:literal $(, $x:expr)* $(,)?) => {{ let _ = ($( &$x, )*); }};
}

#[cfg(feature = "embedded")]
macro_rules! warn {
    ($($arg:tt)*) => { ::defmt::warn!($($arg)*) };
}

#[cfg(not(feature = "embedded"))]
macro_rules! warn {
    ($fmt:literal $(, $x:expr)* $(,)?) => {{ let _ = ($( &$x, )*); }};
}
