//! Logging shims.
//!
//! `debug!` and `warn!` forward to `defmt` when the `defmt` feature is on,
//! otherwise to `log` when the `log` feature is on, and compile to nothing
//! (while still borrowing their arguments) when neither is enabled.

#![allow(unused_macros)]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        macro_rules! debug {
            ($($arg:tt)*) => { ::defmt::debug!($($arg)*) };
        }
        macro_rules! warn {
            ($($arg:tt)*) => { ::defmt::warn!($($arg)*) };
        }
    } else if #[cfg(feature = "log")] {
        macro_rules! debug {
            ($($arg:tt)*) => { ::log::debug!($($arg)*) };
        }
        macro_rules! warn {
            ($($arg:tt)*) => { ::log::warn!($($arg)*) };
        }
    } else {
        macro_rules! debug {
            ($fmt:literal $(, $x:expr)* $(,)?) => {{
                $( let _ = &$x; )*
            }};
        }
        macro_rules! warn {
            ($fmt:literal $(, $x:expr)* $(,)?) => {{
                $( let _ = &$x; )*
            }};
        }
    }
}
