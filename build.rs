fn main() {
    // Target triple shown by `lsgrid --version`.
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=LSGRID_TARGET={}", target);
    println!("cargo:rerun-if-changed=build.rs");
}
