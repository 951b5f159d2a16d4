//! Build identity embedded by `build.rs`.

/// Git SHA the binary was built from, or "unknown" outside a checkout.
pub const BUILD_SHA: &str = env!("NETEMU_GIT_SHA");

/// First 8 characters of the build SHA, for display.
pub fn short_sha() -> &'static str {
    BUILD_SHA.get(..8).unwrap_or(BUILD_SHA)
}
