//! Build script for fan controller firmware
//!
//! Handles:
//! - Linker scripts for Cortex-M targets (memory.x comes from embassy-stm32)
//! - defmt symbol table

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (tests, simulation) link normally
    let target = env::var("TARGET").unwrap_or_default();
    if !target.starts_with("thumb") {
        return;
    }

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
