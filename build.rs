//! Build script for zonealloc.
//!
//! Emits hints when features are combined in ways worth flagging.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DEBUG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");

    let profile = env::var("PROFILE").unwrap_or_default();

    if env::var("CARGO_FEATURE_DEBUG").is_ok() && profile == "release" {
        println!("cargo:warning=[zonealloc] 'debug' feature (memory poisoning) enabled in a release build");
        println!("cargo:warning=[zonealloc]    Every free and reset now writes the whole span; disable for production.");
    }
}
