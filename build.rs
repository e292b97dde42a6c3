fn main() {
    // Writes built.rs into OUT_DIR with package, git and build-time metadata
    built::write_built_file().expect("Failed to acquire build-time information");

    // Tell cargo to rerun this script if git changes
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");
}
