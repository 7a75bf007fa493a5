fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=wifi.local.rs");
    emit_local_secrets_from_wifi_local();

    // Host builds (unit tests) have no ESP-IDF environment to forward.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}

/// Forward credentials from an untracked `wifi.local.rs` as compile-time env
/// vars so they never land in the repository.
fn emit_local_secrets_from_wifi_local() {
    let path = std::path::Path::new("wifi.local.rs");
    let Ok(src) = std::fs::read_to_string(path) else {
        return;
    };

    if let Some(v) = extract_rust_str_const(&src, "WIFI_SSID") {
        println!("cargo:rustc-env=LOCAL_WIFI_SSID={}", v);
    }
    if let Some(v) = extract_rust_str_const(&src, "WIFI_PASS") {
        println!("cargo:rustc-env=LOCAL_WIFI_PASS={}", v);
    }
    if let Some(v) = extract_rust_str_const(&src, "QUOTE_URL") {
        println!("cargo:rustc-env=LOCAL_QUOTE_URL={}", v);
    }
}

fn extract_rust_str_const(src: &str, name: &str) -> Option<String> {
    let needle = format!("pub const {}", name);
    src.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("//"))
        .find(|line| line.starts_with(&needle))
        .and_then(|line| {
            let start = line.find('"')?;
            let end = line[start + 1..].find('"')? + start + 1;
            Some(line[start + 1..end].to_string())
        })
}
