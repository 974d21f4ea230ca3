//! Platform library for Kotlin and Swift hosts.
//!
//! Re-exports [`keyguard_core`] and its `UniFFI` scaffolding so a single
//! `staticlib`/`cdylib` carries every exported symbol.

pub use keyguard_core::*;

keyguard_core::uniffi_reexport_scaffolding!();
