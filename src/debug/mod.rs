//! Debug-only helpers, compiled in behind the `debug` feature.

pub mod poison;
