//! URL and title normalization for raw playlist entries.

use percent_encoding::percent_decode_str;
use reqwest::Url;

/// Resolve `raw` against `base` and force https.
///
/// Returns `None` for blank input. Input that cannot be parsed as a URL is
/// passed through trimmed.
pub fn normalize_url(raw: &str, base: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let resolved = match Url::parse(base) {
        Ok(base) => base.join(trimmed),
        Err(_) => Url::parse(trimmed),
    };

    let Ok(url) = resolved else {
        return Some(trimmed.to_string());
    };

    let href = url.as_str();
    Some(match href.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => href.to_string(),
    })
}

/// Derive a display title from the last path segment of `url`.
pub fn title_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.trim_end_matches('/').rsplit('/').next()?;
    let decoded = percent_decode_str(file).decode_utf8_lossy();
    clean_title(strip_extension(&decoded))
}

/// Drop a trailing `.ext` from a file name, keeping dotfiles intact.
pub(crate) fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(i) => &name[..i],
    }
}

/// Trim a title, treating blank strings as missing.
pub(crate) fn clean_title(raw: &str) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}
