//! Build script for pybradio-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Bakes the version string reported over SPI into the binary

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
    setup_linker();
    embed_version();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Expose `PYBRADIO_VERSION` to the firmware
///
/// Defaults to "pybradio <crate version>"; set `PYBRADIO_VERSION` in the
/// build environment to override. The VERSION reply is limited to 60
/// characters plus the terminator.
fn embed_version() {
    println!("cargo:rerun-if-env-changed=PYBRADIO_VERSION");

    let version = env::var("PYBRADIO_VERSION")
        .unwrap_or_else(|_| format!("pybradio {}", env::var("CARGO_PKG_VERSION").unwrap()));
    if version.len() > 60 {
        panic!("PYBRADIO_VERSION is {} bytes, at most 60 fit in a reply", version.len());
    }

    println!("cargo:rustc-env=PYBRADIO_VERSION={}", version);
}
