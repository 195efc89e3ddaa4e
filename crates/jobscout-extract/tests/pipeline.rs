use jobscout_extract::{
    CandidateDiscoverer, Discovery, ExtractConfig, Html, JobCandidate, RelevanceFilter,
    ResolutionChain, ResolvedVia, Url, Verdict,
};

const LISTING: &str = r##"<!DOCTYPE html>
<html>
  <head><title>Careers at Acme</title></head>
  <body>
    <nav>
      <a href="/about">About us</a>
      <a href="/blog">Engineering blog</a>
      <a href="/privacy">Privacy Policy</a>
      <a href="#openings">Open positions</a>
    </nav>
    <section id="openings">
      <h2>Open positions</h2>
      <ul>
        <li><a href="/jobs/1">Senior DevOps Engineer</a></li>
        <li><a href="/jobs/2?src=careers">Site Reliability Engineer (SRE)</a></li>
        <li><a href="/jobs/3">Frontend Engineer</a></li>
        <li class="row"><span>MLOps Engineer</span> <a href="/jobs/4">Apply</a></li>
        <li><a href="#">SRE Manager</a></li>
      </ul>
    </section>
  </body>
</html>"##;

fn listing_url() -> Url {
    Url::parse("https://acme.example/careers").unwrap()
}

#[test]
fn discovers_relevant_postings_on_listing() {
    let discoverer = CandidateDiscoverer::new(&ExtractConfig::default()).unwrap();
    let found = discoverer.scan_listing_page(LISTING, &listing_url(), "Acme");

    let found = found
        .into_iter()
        .map(|d| match d {
            Discovery::Follow(c) => c,
            Discovery::Inline(c) => panic!("unexpected inline posting {c:?}"),
        })
        .collect::<Vec<_>>();

    let summary = found
        .iter()
        .map(|c| (c.title().unwrap(), c.href().unwrap().as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("Senior DevOps Engineer", "https://acme.example/jobs/1"),
            (
                "Site Reliability Engineer (SRE)",
                "https://acme.example/jobs/2?src=careers"
            ),
            ("MLOps Engineer", "https://acme.example/jobs/4"),
        ]
    );
    assert!(found.iter().all(|c| c.href() != Some(c.source_url())));
}

#[test]
fn resolves_followed_postings() {
    let chain = ResolutionChain::new(&ExtractConfig::default()).unwrap();
    let candidate = JobCandidate::discovered(
        "Acme",
        Some("Senior DevOps Engineer".into()),
        listing_url().join("/jobs/1").ok(),
        listing_url(),
    );

    let page = r#"<html><head>
        <script type="application/ld+json">
          {"@context": "https://schema.org", "@type": "JobPosting",
           "title": "Senior DevOps Engineer", "description": "<p>Build infra</p>"}
        </script></head>
        <body><main><p>Build infra. Plenty of text on the page itself, but structured data
        comes first and is always preferred over page content when it is present and
        usable, no matter how long the page content is.</p></main></body></html>"#;

    let resolved = chain.resolve_candidate(candidate, page);
    assert_eq!(resolved.resolved_via(), Some(ResolvedVia::JsonLd));
    assert_eq!(resolved.description(), Some("Build infra"));
    assert_eq!(resolved.company(), "Acme");
    assert_eq!(resolved.source_url(), &listing_url());
}

#[test]
fn html_only_page() {
    let chain = ResolutionChain::default();
    let body = "Keep the fleet healthy.   Automate\n everything. ".repeat(5);
    let (via, found) = chain.resolve(&Html::parse_document(&format!(
        "<body><header>Acme</header><article><h1>SRE</h1><p>{body}</p></article></body>"
    )));
    assert_eq!(via, ResolvedVia::HtmlExtract);
    let description = found.description.unwrap();
    assert!(description.starts_with("SRE Keep the fleet healthy. Automate everything."));
    assert!(!description.contains("  "));
    assert_eq!(found.title.as_deref(), Some("SRE"));
}

#[test]
fn embedded_positions_listing() {
    let listing = r#"<html><body><div id="app"></div><script>
        window.positions = {"positions": [
          {"title": "DevOps Engineer", "url": "https://jobs.acme.example/p/1"},
          {"title": "Privacy Counsel", "url": "https://jobs.acme.example/p/2"},
          {"title": "SRE on call", "custom_fields": {"details": [{"value": "Follow the sun"}]}}
        ]};
      </script></body></html>"#;
    let found = CandidateDiscoverer::default().scan_listing_page(listing, &listing_url(), "");

    assert_eq!(found.len(), 2);
    assert!(matches!(&found[0], Discovery::Follow(c) if c.company() == "acme.example"));
    let inline = found[1].candidate();
    assert_eq!(inline.resolved_via(), Some(ResolvedVia::Inline));
    assert_eq!(inline.href(), None);
    assert_eq!(inline.description(), Some("Follow the sun"));
}

#[test]
fn relevance_rules_in_order() {
    let filter = RelevanceFilter::default();
    assert_eq!(filter.verdict("Ops"), Verdict::TooShort);
    assert_eq!(filter.verdict("Terms of the SRE program"), Verdict::Noise);
    assert_eq!(filter.verdict("Data Engineer"), Verdict::NotARole);
    assert_eq!(filter.verdict("SRE (m/f/d)"), Verdict::Accept);
}
