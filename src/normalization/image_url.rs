use url::Url;

const SHIKIMORI_HOST: &str = "shikimori.one";

/// Canonicalize a Shikimori image URL.
///
/// Protocol-relative URLs get `https:`, root-relative paths are resolved against
/// `https://shikimori.one`, and mirror subdomains (`nyaa.shikimori.one`, ...) are
/// folded into the main host. Path and query are kept. Blank or unparsable input
/// yields `None`; URLs on other hosts come back parsed but otherwise untouched.
pub fn normalize_shikimori_image_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else if trimmed.starts_with('/') {
        format!("https://{SHIKIMORI_HOST}{trimmed}")
    } else {
        trimmed.to_string()
    };

    let mut parsed = Url::parse(&candidate).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if host != SHIKIMORI_HOST && host.ends_with(".shikimori.one") {
        parsed.set_host(Some(SHIKIMORI_HOST)).ok()?;
    }
    Some(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_mirror_subdomains() {
        assert_eq!(
            normalize_shikimori_image_url(
                "https://nyaa.shikimori.one/uploads/poster/animes/11757/x.jpeg"
            )
            .as_deref(),
            Some("https://shikimori.one/uploads/poster/animes/11757/x.jpeg")
        );
    }

    #[test]
    fn resolves_relative_forms() {
        assert_eq!(
            normalize_shikimori_image_url("/uploads/poster/animes/199/x.jpeg").as_deref(),
            Some("https://shikimori.one/uploads/poster/animes/199/x.jpeg")
        );
        assert_eq!(
            normalize_shikimori_image_url("  //dere.shikimori.one/a.jpg?1700000000 ").as_deref(),
            Some("https://shikimori.one/a.jpg?1700000000")
        );
    }

    #[test]
    fn leaves_foreign_hosts_alone() {
        assert_eq!(
            normalize_shikimori_image_url("https://st.kp.yandex.net/images/film_big/1.jpg")
                .as_deref(),
            Some("https://st.kp.yandex.net/images/film_big/1.jpg")
        );
    }

    #[test]
    fn rejects_blank_and_garbage() {
        assert_eq!(normalize_shikimori_image_url("   "), None);
        assert_eq!(normalize_shikimori_image_url("not a url"), None);
    }
}
