//! Bucket key naming.
//!
//! Layout: `cookie-store:<store_id>:cookie:<domain>[:<path>]`. The store id sits
//! before the fixed `cookie` segment so keys of different jars never collide.
//! Values are used as given; callers normalize domain and path.

const KEY_PREFIX: &str = "cookie-store";

/// Returns the bucket key for `(domain, path)`, or the domain prefix when `path` is `None`.
///
/// The prefix form is only meant to build scan patterns; no bucket lives at it.
pub fn key_name(store_id: &str, domain: &str, path: Option<&str>) -> String {
    match path {
        Some(path) if !path.is_empty() => format!("{KEY_PREFIX}:{store_id}:cookie:{domain}:{path}"),
        _ => format!("{KEY_PREFIX}:{store_id}:cookie:{domain}"),
    }
}

/// Escapes glob metacharacters so `s` matches only itself inside a scan pattern.
pub fn escape_glob(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
