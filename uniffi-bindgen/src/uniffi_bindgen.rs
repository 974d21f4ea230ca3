//! Generates the Kotlin and Swift bindings for the `keyguard` library.

fn main() {
    uniffi::uniffi_bindgen_main();
}
