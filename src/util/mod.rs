//! Display helpers.

use std::borrow::Cow;
use url::Url;

/// Extract the display domain from a bookmark URL.
///
/// Total: any string that fails to parse as a URL, or parses without a
/// host, is returned unchanged. A leading `www.` is stripped from the
/// host for display.
pub fn domain_of(raw: &str) -> Cow<'_, str> {
    let Ok(url) = Url::parse(raw) else {
        return Cow::Borrowed(raw);
    };
    let Some(host) = url.host_str() else {
        return Cow::Borrowed(raw);
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    Cow::Owned(host.to_string())
}
