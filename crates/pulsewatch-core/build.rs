fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    let date = chrono::Utc::now().format("%Y-%m-%d");
    println!("cargo:rustc-env=BUILD_DATE={}", date);
}
