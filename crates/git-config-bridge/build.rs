//! Build script for git-config-bridge crate.
//!
//! When the `native-link` feature is enabled, the crate calls into the native
//! config library directly and must link against it.

fn main() {
    if std::env::var_os("CARGO_FEATURE_NATIVE_LINK").is_some() {
        println!("cargo:rustc-link-lib=git2");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
