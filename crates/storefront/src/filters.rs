//! Askama filters shared by the page templates.
//!
//! Both filters only produce a value, so templates feed them an empty
//! string: `{{ ""|css_hash }}`.

use std::fmt::Display;

use chrono::Datelike;

/// Year shown in the footer.
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    Ok(chrono::Local::now().year())
}

/// Fingerprint of `static/css/main.css`, set by `build.rs`.
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}
