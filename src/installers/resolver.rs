// This module resolves "the latest installer" for a target whose download URL is not
// fixed. A listing source is either a vendor downloads page, scraped for `<a href>`
// links matching a pattern, or the latest GitHub release of a repository, whose asset
// URLs are matched the same way. Among the matches the newest file name wins.

// The HTTP seam: the resolver only ever fetches text, never downloads.
use crate::installers::http::HttpClient;
// The run context carries the run log the debug lines below are written to.
use crate::libs::run_context::RunContext;
// Version-aware comparison of vendor file names, and the dotted version we report.
use crate::libs::utilities::versions::{compare_file_names, extract_dotted_version};
// Debug lines go to the per-run log, not just the console.
use crate::run_debug;
// Every failure here is a per-target `InstallError`.
use crate::schemas::errors::InstallError;
// The two kinds of listing a target can point at.
use crate::schemas::targets::ListingSource;
// `regex` compiles the user's link pattern and scans the page for anchors.
use regex::Regex;
// For reading the GitHub release document.
use serde::Deserialize;
use std::cmp::Ordering;
// Ordered set: dedupes candidate URLs and keeps iteration deterministic.
use std::collections::BTreeSet;
// Static patterns are compiled once, on first use.
use std::sync::LazyLock;
// RFC 3986 parsing and relative-link joining.
use url::Url;

// `<a ... href=...>` with a double-quoted, single-quoted or bare attribute value.
// The attribute name must follow whitespace, so `data-href` and friends never match.
static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a(?:\s[^>]*?)?\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("anchor pattern is valid")
});

// Same shape for `<base href=...>`, which changes what relative links resolve against.
static BASE_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<base(?:\s[^>]*?)?\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("base pattern is valid")
});

/// The chosen download: an absolute URL plus the file name it will be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub url: String,
    pub filename: String,
    pub version_label: Option<String>,
}

impl ResolvedVersion {
    /// Derives the file name and version label from an absolute URL. `target_name`
    /// supplies the fallback name when the URL path has no usable segment.
    pub fn from_url(url: &Url, target_name: &str) -> Self {
        // A bare host or a path ending in `/` leaves nothing to name the file after.
        let filename =
            filename_from_url(url).unwrap_or_else(|| format!("{target_name}-installer.exe"));
        let version_label = extract_dotted_version(&filename).map(str::to_string);
        ResolvedVersion {
            url: url.to_string(),
            filename,
            version_label,
        }
    }

    /// A fixed download URL; no resolution happens, but the URL must be absolute.
    pub fn from_direct(url: &str, target_name: &str) -> Result<Self, InstallError> {
        // A relative or garbled URL is a configuration mistake; fetching again won't help.
        let parsed = Url::parse(url).map_err(|e| InstallError::UnusableSource {
            url: url.to_string(),
            reason: format!("not an absolute URL: {e}"),
        })?;
        Ok(ResolvedVersion::from_url(&parsed, target_name))
    }
}

/// Last non-empty path segment of `url`. A trailing `download` segment, as used by
/// SourceForge mirrors, is skipped in favour of the one before it.
pub fn filename_from_url(url: &Url) -> Option<String> {
    // `cannot-be-a-base` URLs (`mailto:` and the like) have no segments at all.
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    // Walk from the end of the path.
    let mut rev = segments.iter().rev();
    let last = rev.next()?;
    let chosen = if last.eq_ignore_ascii_case("download") {
        rev.next()?
    } else {
        last
    };
    Some((*chosen).to_string())
}

/// Returns every `<a href>` value on the page, with `&amp;` decoded, in page order.
pub fn extract_links(html: &str) -> Vec<String> {
    ANCHOR_HREF
        .captures_iter(html)
        // Exactly one of the three groups matched: double-quoted, single-quoted or bare.
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        // Query strings on vendor pages are almost always HTML-escaped.
        .map(|m| m.as_str().trim().replace("&amp;", "&"))
        // `href=""` points back at the page itself.
        .filter(|href| !href.is_empty())
        .collect()
}

/// The URL relative links resolve against: `<base href>` when present (itself resolved
/// against the page), otherwise the URL the page was finally served from.
fn base_url(html: &str, final_url: &Url) -> Url {
    // Only the first `<base>` counts, as in a browser.
    BASE_HREF
        .captures(html)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .and_then(|m| final_url.join(&m.as_str().replace("&amp;", "&")).ok())
        .unwrap_or_else(|| final_url.clone())
}

// A pattern that does not compile is reported before anything is fetched.
fn compile_pattern(pattern: &str) -> Result<Regex, InstallError> {
    Regex::new(pattern).map_err(|e| InstallError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Version-aware ordering of two candidates: file name first, full URL on ties.
fn compare_candidates(a: &ResolvedVersion, b: &ResolvedVersion) -> Ordering {
    compare_file_names(&a.filename, &b.filename).then_with(|| a.url.cmp(&b.url))
}

/// Picks the newest of the candidate URLs. Duplicates are ignored.
pub fn select_latest(candidates: &[Url], target_name: &str) -> Option<ResolvedVersion> {
    // The same link often appears twice on a page (icon and text).
    let unique: BTreeSet<&Url> = candidates.iter().collect();
    unique
        .into_iter()
        .map(|url| ResolvedVersion::from_url(url, target_name))
        .max_by(compare_candidates)
}

/// Resolves the single latest download URL for a listing source.
///
/// Performs exactly one fetch; retrying transient failures is the caller's business.
pub fn resolve_latest(
    ctx: &RunContext,
    http: &dyn HttpClient,
    target_name: &str,
    listing: &ListingSource,
) -> Result<ResolvedVersion, InstallError> {
    // Fail fast on a bad pattern; no request is made.
    let pattern = compile_pattern(listing.pattern())?;
    // `page` is whatever we fetched, so errors can name it.
    let (page, candidates) = match listing {
        ListingSource::Page { page_url, .. } => {
            (page_url.clone(), page_candidates(ctx, http, page_url, &pattern)?)
        }
        ListingSource::GithubRelease { repo, .. } => {
            // The API's "latest" already skips drafts and pre-releases.
            let api_url = format!("https://api.github.com/repos/{repo}/releases/latest");
            let candidates = release_candidates(ctx, http, &api_url, &pattern)?;
            (api_url, candidates)
        }
    };

    run_debug!(
        ctx.log,
        "[{}] {} link(s) on {} match '{}'",
        target_name,
        candidates.len(),
        page,
        listing.pattern()
    );

    // An empty candidate list means the page loaded but nothing matched.
    select_latest(&candidates, target_name).ok_or_else(|| InstallError::NoInstallerFound {
        page,
        pattern: listing.pattern().to_string(),
    })
}

/// Fetches a downloads page and returns every matching link as an absolute URL.
fn page_candidates(
    ctx: &RunContext,
    http: &dyn HttpClient,
    page_url: &str,
    pattern: &Regex,
) -> Result<Vec<Url>, InstallError> {
    let fetched = http.get_text(page_url)?;
    // Redirects may have moved us; relative links are relative to where we landed.
    let final_url = Url::parse(&fetched.final_url)
        .or_else(|_| Url::parse(page_url))
        .map_err(|e| InstallError::UnusableSource {
            url: page_url.to_string(),
            reason: format!("not an absolute URL: {e}"),
        })?;
    let base = base_url(&fetched.body, &final_url);

    let mut candidates = Vec::new();
    for href in extract_links(&fetched.body) {
        // The pattern sees the href as written, before joining.
        if !pattern.is_match(&href) {
            continue;
        }
        // `javascript:` links and other oddities fail to join and are dropped.
        match base.join(&href) {
            Ok(url) => candidates.push(url),
            Err(e) => run_debug!(ctx.log, "Ignoring unusable link '{}': {}", href, e),
        }
    }
    Ok(candidates)
}

/// The subset of the GitHub "latest release" document the resolver needs. Every other
/// field (tag, body, author, ...) is ignored by serde.
#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    browser_download_url: String,
}

/// Fetches the latest release document and returns the matching asset URLs.
fn release_candidates(
    ctx: &RunContext,
    http: &dyn HttpClient,
    api_url: &str,
    pattern: &Regex,
) -> Result<Vec<Url>, InstallError> {
    let fetched = http.get_text(api_url)?;
    // A 200 with a body that isn't a release (an HTML error page, say) is final.
    let release: Release =
        serde_json::from_str(&fetched.body).map_err(|e| InstallError::UnusableSource {
            url: api_url.to_string(),
            reason: format!("unexpected release document: {e}"),
        })?;

    let mut candidates = Vec::new();
    for asset in release.assets {
        // Asset patterns match the full download URL.
        if !pattern.is_match(&asset.browser_download_url) {
            continue;
        }
        match Url::parse(&asset.browser_download_url) {
            Ok(url) => candidates.push(url),
            Err(e) => run_debug!(
                ctx.log,
                "Ignoring asset '{}': {}",
                asset.browser_download_url,
                e
            ),
        }
    }
    Ok(candidates)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::installers::http::FetchedPage;
    use crate::libs::run_context::CancelToken;
    use crate::logger::RunLog;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;

    /// In-memory `HttpClient`: canned pages keyed by URL, downloads write `body`.
    #[derive(Default)]
    pub(crate) struct FakeHttp {
        pub pages: HashMap<String, FetchedPage>,
        pub downloads: HashMap<String, Vec<u8>>,
        pub requests: RefCell<Vec<String>>,
    }

    impl FakeHttp {
        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                FetchedPage {
                    final_url: url.to_string(),
                    body: body.to_string(),
                },
            );
            self
        }

        pub fn file(mut self, url: &str, bytes: &[u8]) -> Self {
            self.downloads.insert(url.to_string(), bytes.to_vec());
            self
        }
    }

    impl HttpClient for FakeHttp {
        fn get_text(&self, url: &str) -> Result<FetchedPage, InstallError> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| InstallError::Fetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".into(),
            })
        }

        fn download(
            &self,
            url: &str,
            dest: &Path,
            cancel: &CancelToken,
        ) -> Result<u64, InstallError> {
            self.requests.borrow_mut().push(url.to_string());
            if cancel.is_cancelled() {
                return Err(InstallError::Cancelled);
            }
            let bytes = self.downloads.get(url).ok_or_else(|| InstallError::Fetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".into(),
            })?;
            std::fs::write(dest, bytes).map_err(|source| InstallError::Io {
                context: "write".into(),
                source,
            })?;
            Ok(bytes.len() as u64)
        }
    }

    fn ctx() -> RunContext {
        RunContext::new(RunLog::console_only(false), CancelToken::default())
    }

    fn page(url: &str, pattern: &str) -> ListingSource {
        ListingSource::Page {
            page_url: url.to_string(),
            link_pattern: pattern.to_string(),
        }
    }

    #[test]
    fn picks_highest_numeric_version_and_joins_relative_links() {
        let html = r#"
            <html><body>
              <a href="app-1.2.0_setup.exe">1.2.0</a>
              <a class="dl" href='app-1.10.0_setup.exe'>1.10.0</a>
              <A HREF=app-1.9.0_setup.exe>1.9.0</A>
              <a href="/other/readme.txt">readme</a>
            </body></html>"#;
        let http = FakeHttp::default().page("https://vendor.test/downloads/", html);

        let resolved = resolve_latest(
            &ctx(),
            &http,
            "app",
            &page("https://vendor.test/downloads/", r"app-[\d.]+_setup\.exe$"),
        )
        .unwrap();
        assert_eq!(resolved.url, "https://vendor.test/downloads/app-1.10.0_setup.exe");
        assert_eq!(resolved.filename, "app-1.10.0_setup.exe");
        assert_eq!(resolved.version_label.as_deref(), Some("1.10.0"));
    }

    #[test]
    fn result_is_always_one_of_the_candidates() {
        let html = r#"<a href="https://mirror.test/x-2.0.exe">a</a>
                      <a href="x-2.0.exe">b</a>
                      <a href="x-2.0.exe">dup</a>"#;
        let http = FakeHttp::default().page("https://vendor.test/", html);
        let resolved =
            resolve_latest(&ctx(), &http, "x", &page("https://vendor.test/", r"x-.*\.exe")).unwrap();
        assert!(
            ["https://mirror.test/x-2.0.exe", "https://vendor.test/x-2.0.exe"]
                .contains(&resolved.url.as_str())
        );
        assert!(Url::parse(&resolved.url).is_ok());
    }

    #[test]
    fn sourceforge_style_links_use_the_segment_before_download() {
        let html = r#"
            <a href="/projects/fldigi/files/fldigi/fldigi-4.1.27_x64-setup.exe/download">old</a>
            <a href="/projects/fldigi/files/fldigi/fldigi-4.2.05_x64-setup.exe/download">new</a>
            <a href="/projects/fldigi/files/fldigi/fldigi-4.2.05.tar.gz/download">src</a>"#;
        let listing = "https://sourceforge.net/projects/fldigi/files/fldigi/";
        let http = FakeHttp::default().page(listing, html);
        let resolved = resolve_latest(
            &ctx(),
            &http,
            "fldigi",
            &page(listing, r"fldigi-[\d.]+_x64-setup\.exe/download$"),
        )
        .unwrap();
        assert_eq!(
            resolved.url,
            "https://sourceforge.net/projects/fldigi/files/fldigi/fldigi-4.2.05_x64-setup.exe/download"
        );
        assert_eq!(resolved.filename, "fldigi-4.2.05_x64-setup.exe");
    }

    #[test]
    fn base_href_and_ampersands_are_honoured() {
        let html = r#"<head><base href="https://cdn.test/files/"></head>
                      <a href="get?f=tool-3.1.exe&amp;mirror=1">dl</a>"#;
        let http = FakeHttp::default().page("https://vendor.test/page", html);
        let resolved =
            resolve_latest(&ctx(), &http, "tool", &page("https://vendor.test/page", r"tool-")).unwrap();
        assert_eq!(resolved.url, "https://cdn.test/files/get?f=tool-3.1.exe&mirror=1");
        assert_eq!(resolved.filename, "get");
    }

    #[test]
    fn data_attributes_are_not_links() {
        assert_eq!(
            extract_links(r#"<a data-href="/track?id=1" href="app-2.0.exe">dl</a>"#),
            ["app-2.0.exe"]
        );
        assert!(extract_links(r#"<a data-href="app-2.0.exe">no real href</a>"#).is_empty());
        assert!(extract_links(r#"<abbr href="app-2.0.exe">not an anchor</abbr>"#).is_empty());

        let html = r#"<base data-href="https://tracker.test/" href="https://cdn.test/files/">
                      <a data-track="1" data-href="/track?id=1"
                         href="app-2.0.exe">dl</a>"#;
        let http = FakeHttp::default().page("https://vendor.test/", html);
        let resolved =
            resolve_latest(&ctx(), &http, "app", &page("https://vendor.test/", r"\.exe$")).unwrap();
        assert_eq!(resolved.url, "https://cdn.test/files/app-2.0.exe");
    }

    #[test]
    fn unusable_documents_are_not_transient() {
        let http = FakeHttp::default()
            .page(
                "https://api.github.com/repos/foldynl/QLog/releases/latest",
                "<html>API rate limit exceeded</html>",
            )
            .page("vendor/downloads", r#"<a href="x-1.0.exe">x</a>"#);

        let err = resolve_latest(
            &ctx(),
            &http,
            "qlog",
            &ListingSource::GithubRelease {
                repo: "foldynl/QLog".into(),
                asset_pattern: r"\.exe$".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), "UnusableSource");
        assert!(!err.is_transient());

        let err = resolve_latest(&ctx(), &http, "x", &page("vendor/downloads", r"\.exe$"))
            .unwrap_err();
        assert_eq!(err.kind(), "UnusableSource");
        assert!(!err.is_transient());
    }

    #[test]
    fn no_match_is_no_installer_found() {
        let http = FakeHttp::default().page("https://vendor.test/", r#"<a href="notes.txt">n</a>"#);
        let err = resolve_latest(&ctx(), &http, "x", &page("https://vendor.test/", r"\.exe$"))
            .unwrap_err();
        assert_eq!(err.kind(), "NoInstallerFound");
    }

    #[test]
    fn unreachable_page_and_bad_pattern_are_distinct_errors() {
        let http = FakeHttp::default();
        let err = resolve_latest(&ctx(), &http, "x", &page("https://down.test/", r"\.exe$"))
            .unwrap_err();
        assert_eq!(err.kind(), "FetchError");
        assert!(err.is_transient());

        let err = resolve_latest(&ctx(), &http, "x", &page("https://down.test/", r"([unclosed"))
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidPattern");
        assert!(http.requests.borrow().len() == 1);
    }

    #[test]
    fn github_release_assets_are_matched() {
        let release = r#"{
            "tag_name": "v0.28.0",
            "assets": [
                {"name": "qlog-0.28.0-linux.AppImage",
                 "browser_download_url": "https://github.com/foldynl/QLog/releases/download/v0.28.0/qlog-0.28.0-linux.AppImage"},
                {"name": "QLog-0.28.0-win64.exe",
                 "browser_download_url": "https://github.com/foldynl/QLog/releases/download/v0.28.0/QLog-0.28.0-win64.exe"}
            ]
        }"#;
        let http = FakeHttp::default()
            .page("https://api.github.com/repos/foldynl/QLog/releases/latest", release);
        let resolved = resolve_latest(
            &ctx(),
            &http,
            "qlog",
            &ListingSource::GithubRelease {
                repo: "foldynl/QLog".into(),
                asset_pattern: r"win64\.exe$".into(),
            },
        )
        .unwrap();
        assert_eq!(resolved.filename, "QLog-0.28.0-win64.exe");
        assert_eq!(resolved.version_label.as_deref(), Some("0.28.0"));
    }

    #[test]
    fn filename_falls_back_to_target_name() {
        let url = Url::parse("https://vendor.test/").unwrap();
        assert_eq!(ResolvedVersion::from_url(&url, "vara-hf").filename, "vara-hf-installer.exe");

        let direct = ResolvedVersion::from_direct("https://vendor.test/a/b/setup.msi", "x").unwrap();
        assert_eq!(direct.filename, "setup.msi");
        let err = ResolvedVersion::from_direct("setup.msi", "x").unwrap_err();
        assert_eq!(err.kind(), "UnusableSource");
        assert!(!err.is_transient());
    }

    #[test]
    fn ties_break_on_full_url() {
        let a = Url::parse("https://a.test/app-1.0.exe").unwrap();
        let b = Url::parse("https://b.test/app-1.0.exe").unwrap();
        let picked = select_latest(&[b.clone(), a.clone(), b.clone()], "app").unwrap();
        assert_eq!(picked.url, b.to_string());
        assert!(select_latest(&[], "app").is_none());
    }
}
