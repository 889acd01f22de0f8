use std::env;
use time::OffsetDateTime;

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    // Reproducible builds pin the stamp through SOURCE_DATE_EPOCH
    let build_year = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
        .map(|dt| dt.year())
        .unwrap_or_else(|| OffsetDateTime::now_utc().year());
    println!("cargo:rustc-env=APP_BUILD_YEAR={build_year}");

    let package_version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let profile = env::var("PROFILE").unwrap_or_default();
    let camera = if env::var_os("CARGO_FEATURE_CAMERA").is_some() {
        "opencv"
    } else {
        "no camera"
    };

    // e.g. "0.1.0-debug, opencv" or "0.1.0, no camera"
    let display_version = if profile == "release" {
        format!("{package_version}, {camera}")
    } else {
        format!("{package_version}-{profile}, {camera}")
    };
    println!("cargo:rustc-env=APP_VERSION_DISPLAY={display_version}");
}
