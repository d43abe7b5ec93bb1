//! Domain and path permutations used to look up cookies.
//!
//! A cookie set for `example.com` also applies to `www.example.com`, and a cookie
//! set for `/docs` also applies to `/docs/api`. A lookup therefore has to visit
//! every bucket whose domain is a suffix of the requested domain (down to the
//! registrable domain) and whose path is a prefix of the requested path.
//!
//! Domains are not normalized: the permutations are slices of the domain exactly
//! as given, the same spelling the key namer writes buckets under. Only the
//! comparisons against the suffix tables ignore ASCII case.
//!
//! The public suffix rules are an approximation. `MULTI_LABEL_SUFFIXES` lists a
//! few dozen common second-level registries and hosting suffixes; every suffix
//! not listed there (most of the public suffix list, wildcard and exception rules
//! included) is treated as a single label, so `a.b.kyoto.jp` is permuted down to
//! `kyoto.jp`.

use std::net::IpAddr;

/// Top-level labels reserved for special use (RFC 6761).
const SPECIAL_USE_DOMAINS: &[&str] = &["local", "example", "invalid", "localhost", "test"];

/// Public suffixes made of more than one label, lowercase. Any other domain is
/// assumed to have a single-label public suffix.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "ac.uk", "co.uk", "gov.uk", "ltd.uk", "me.uk", "net.uk", "org.uk", "plc.uk", "sch.uk",
    "com.au", "edu.au", "gov.au", "net.au", "org.au", "id.au",
    "co.nz", "net.nz", "org.nz", "govt.nz",
    "co.jp", "ne.jp", "or.jp", "ac.jp", "go.jp",
    "co.kr", "or.kr", "go.kr",
    "com.br", "net.br", "org.br", "gov.br",
    "com.cn", "net.cn", "org.cn", "gov.cn", "edu.cn",
    "com.hk", "com.sg", "com.tw", "com.mx", "com.ar", "com.tr",
    "co.in", "net.in", "org.in", "gov.in",
    "co.za", "org.za", "gov.za",
    "co.il", "org.il",
    "github.io", "herokuapp.com", "appspot.com", "blogspot.com", "cloudfront.net",
];

/// Returns the registrable domain (public suffix plus one label) of `domain`.
///
/// `None` when `domain` is empty, an IP literal, a bare public suffix, or a
/// special-use domain while `allow_special_use` is off.
pub fn registrable_domain(domain: &str, allow_special_use: bool) -> Option<String> {
    registrable_len(domain, allow_special_use).map(|len| domain[domain.len() - len..].to_string())
}

/// Byte length of the registrable tail of `domain`.
fn registrable_len(domain: &str, allow_special_use: bool) -> Option<usize> {
    if domain.is_empty() || domain.parse::<IpAddr>().is_ok() {
        return None;
    }

    // A trailing dot leaves an empty label, so fully-qualified names are looked up literally.
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.iter().any(|l| l.is_empty()) {
        return None;
    }
    let top = labels[labels.len() - 1].to_ascii_lowercase();

    let keep = if SPECIAL_USE_DOMAINS.contains(&top.as_str()) {
        if !allow_special_use {
            return None;
        }
        labels.len().min(2)
    } else {
        let suffix_labels = if labels.len() >= 2
            && MULTI_LABEL_SUFFIXES.contains(&labels[labels.len() - 2..].join(".").to_ascii_lowercase().as_str())
        {
            2
        } else {
            1
        };
        if labels.len() <= suffix_labels {
            return None;
        }
        suffix_labels + 1
    };

    let tail = &labels[labels.len() - keep..];
    Some(tail.iter().map(|l| l.len()).sum::<usize>() + tail.len() - 1)
}

/// Returns the domains a cookie matching `domain` may be stored under, shortest first.
///
/// `a.b.example.com` yields `example.com`, `b.example.com`, `a.b.example.com`.
pub fn permute_domain(domain: &str, allow_special_use: bool) -> Option<Vec<String>> {
    let len = registrable_len(domain, allow_special_use)?;

    let mut permutations = vec![domain[domain.len() - len..].to_string()];
    let mut start = domain.len() - len;
    // Walk left one label at a time; every step starts right after a dot.
    while start > 0 {
        start = domain[..start - 1].rfind('.').map_or(0, |dot| dot + 1);
        permutations.push(domain[start..].to_string());
    }
    Some(permutations)
}

/// Returns the paths a cookie matching `path` may be stored under, longest first.
///
/// `/a/b/c` yields `/a/b/c`, `/a/b`, `/a`, `/`.
pub fn permute_path(path: &str) -> Vec<String> {
    if path == "/" {
        return vec!["/".to_string()];
    }

    let mut permutations = vec![path.to_string()];
    let mut current = path;
    while current.len() > 1 {
        match current.rfind('/') {
            Some(idx) if idx > 0 => {
                current = &current[..idx];
                permutations.push(current.to_string());
            }
            _ => break,
        }
    }
    permutations.push("/".to_string());
    permutations
}
