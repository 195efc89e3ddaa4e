use url::Url;

/// Resolves an `href` found on `page_url` into an absolute link to follow.
///
/// Rejects missing or blank hrefs, targets that are not http(s) and links
/// back to the page itself. Fragments are ignored for that last check, so
/// `href="#"` and `href="#openings"` both count as self-links.
pub fn resolve_link(href: Option<&str>, page_url: &Url) -> Option<Url> {
    let href = href.map(str::trim).filter(|h| !h.is_empty())?;
    let resolved = page_url.join(href).ok()?;

    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    if same_document(&resolved, page_url) {
        return None;
    }

    Some(resolved)
}

fn same_document(a: &Url, b: &Url) -> bool {
    let strip = |url: &Url| {
        let mut url = url.clone();
        url.set_fragment(None);
        url
    };
    strip(a) == strip(b)
}

/// Company name derived from a careers URL when no better name is known.
pub fn company_from_url(url: &Url) -> String {
    match url.host_str() {
        Some(host) => host.trim_start_matches("www.").to_string(),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://acme.example/careers/").unwrap()
    }

    #[test]
    fn resolves_relative_and_absolute() {
        assert_eq!(
            resolve_link(Some("/jobs/1"), &page()).unwrap().as_str(),
            "https://acme.example/jobs/1"
        );
        assert_eq!(
            resolve_link(Some("sre-2"), &page()).unwrap().as_str(),
            "https://acme.example/careers/sre-2"
        );
        assert_eq!(
            resolve_link(Some(" https://jobs.other.example/p/9 "), &page())
                .unwrap()
                .as_str(),
            "https://jobs.other.example/p/9"
        );
    }

    #[test]
    fn rejects_missing_and_blank() {
        assert_eq!(resolve_link(None, &page()), None);
        assert_eq!(resolve_link(Some(""), &page()), None);
        assert_eq!(resolve_link(Some("   "), &page()), None);
    }

    #[test]
    fn rejects_self_links() {
        assert_eq!(resolve_link(Some("#"), &page()), None);
        assert_eq!(resolve_link(Some("#open-roles"), &page()), None);
        assert_eq!(resolve_link(Some("."), &page()), None);
        assert_eq!(resolve_link(Some(page().as_str()), &page()), None);
    }

    #[test]
    fn rejects_non_http_targets() {
        assert_eq!(resolve_link(Some("mailto:jobs@acme.example"), &page()), None);
        assert_eq!(resolve_link(Some("javascript:void(0)"), &page()), None);
    }

    #[test]
    fn resolution_is_idempotent() {
        let once = resolve_link(Some("../team/sre?x=1"), &page()).unwrap();
        let twice = resolve_link(Some(once.as_str()), &page()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn company_from_host() {
        assert_eq!(company_from_url(&page()), "acme.example");
        let www = Url::parse("https://www.dreamgroup.com/careers/").unwrap();
        assert_eq!(company_from_url(&www), "dreamgroup.com");
    }
}
