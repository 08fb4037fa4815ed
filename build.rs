// Build script to ensure Cargo rebuilds when embedded assets change.
// rust-embed embeds files at compile time, but Cargo's incremental compilation
// may not detect changes to the page template or stylesheet.

fn main() {
    println!("cargo:rerun-if-changed=src/assets/");
    println!("cargo:rerun-if-changed=templates/");
}
