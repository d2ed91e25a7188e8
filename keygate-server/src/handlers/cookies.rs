//! Session cookie contract.
//!
//! Login sets two cookies: the HttpOnly bearer cookie and a non-HttpOnly
//! marker UIs read to detect a live session. Both are SameSite=Strict and
//! expire together with the access key.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};

pub const COOKIE_TOKEN_NAME: &str = "token";
pub const COOKIE_LOGIN_NAME: &str = "login";

fn expiration(expires_at: DateTime<Utc>) -> time::OffsetDateTime {
    time::OffsetDateTime::from_unix_timestamp(expires_at.timestamp())
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH)
}

pub fn set_auth_cookies(jar: CookieJar, bearer: &str, expires_at: DateTime<Utc>) -> CookieJar {
    let expires = expiration(expires_at);

    let token = Cookie::build((COOKIE_TOKEN_NAME, bearer.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .expires(expires)
        .build();

    let login = Cookie::build((COOKIE_LOGIN_NAME, "1"))
        .path("/")
        .same_site(SameSite::Strict)
        .expires(expires)
        .build();

    jar.add(token).add(login)
}

pub fn clear_auth_cookies(jar: CookieJar) -> CookieJar {
    let token = Cookie::build((COOKIE_TOKEN_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .build();

    let login = Cookie::build((COOKIE_LOGIN_NAME, ""))
        .path("/")
        .same_site(SameSite::Strict)
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .build();

    jar.add(token).add(login)
}
