//! Minimal leveled diagnostic output, gated by the `WORLDGEN_LOG` env var
//! (`off` | `info` | `debug`, default `off`). No logging crate appears
//! anywhere in this project's lineage, so this follows the same
//! direct-to-stderr idiom the rest of the pipeline already uses, just
//! level-checked instead of unconditional.

use std::sync::OnceLock;

#[derive(Clone, Copy, PartialEq, PartialOrd, Debug)]
pub enum Level {
    Off = 0,
    Info = 1,
    Debug = 2,
}

fn configured_level() -> Level {
    static LEVEL: OnceLock<Level> = OnceLock::new();
    *LEVEL.get_or_init(|| match std::env::var("WORLDGEN_LOG") {
        Ok(s) if s.eq_ignore_ascii_case("debug") => Level::Debug,
        Ok(s) if s.eq_ignore_ascii_case("info") => Level::Info,
        _ => Level::Off,
    })
}

#[doc(hidden)]
pub fn enabled(level: Level) -> bool {
    (configured_level() as i32) >= (level as i32)
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::Level::Info) {
            eprintln!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::Level::Debug) {
            eprintln!($($arg)*);
        }
    };
}
