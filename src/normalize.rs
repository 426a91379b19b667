/// Canonical keys for comparing emojis: image URLs, names and tags
use url::Url;

/// Map an image URL to a canonical string for duplicate detection
///
/// Algorithm:
/// 1. Trim whitespace; an empty string has no key
/// 2. Treat protocol-relative URLs ("//host/path") as https
/// 3. If the string parses as a URL with a host:
///    → http becomes https, host is lowercased, a leading "www." is dropped,
///      query string and fragment are removed
/// 4. Else:
///    → the trimmed string itself is the key (data: URIs, relative paths)
///
/// Examples:
/// - https://x/a.png?x=1 → https://x/a.png
/// - http://WWW.Example.com/a.png#top → https://example.com/a.png
/// - //cdn.example.com/a.png → https://cdn.example.com/a.png
pub fn normalize_image_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = match trimmed.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => trimmed.to_string(),
    };

    match Url::parse(&candidate) {
        Ok(mut url) if url.host_str().is_some() => {
            if url.scheme() == "http" {
                // http and https are both special schemes, so this cannot fail
                let _ = url.set_scheme("https");
            }
            url.set_query(None);
            url.set_fragment(None);

            let bare_host = url
                .host_str()
                .and_then(|host| host.strip_prefix("www."))
                .map(str::to_owned);
            if let Some(host) = bare_host {
                if url.set_host(Some(&host)).is_err() {
                    return Some(trimmed.to_string());
                }
            }

            Some(url.to_string())
        }
        _ => Some(trimmed.to_string()),
    }
}

/// Dedup key for an emoji name: trimmed and lowercased, empty → no key
pub fn name_key(name: &str) -> Option<String> {
    let key = name.trim().to_lowercase();
    if key.is_empty() { None } else { Some(key) }
}

/// Normalize a tag before any comparison or storage
pub fn clean_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Normalize a list of tags, dropping the ones that end up empty
pub fn clean_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    tags.iter()
        .map(|t| clean_tag(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect()
}
