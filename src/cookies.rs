// src/cookies.rs
//! Cookies: [`Cookie`], the [`CookieStore`] contract and the key-value backed [`KvCookieStore`].

mod cookies;
mod store;

pub mod codec;
pub mod keys;
pub mod permute;

pub use cookies::Cookie;

pub use store::CookieStore;
pub use store::KvCookieStore;
pub use store::Listing;
