//! Report acquisition: scrape PDF links from a saved listing page, download
//! them, and group the files into per-project directories.
//!
//! Report files published on the listing page are named
//! `"<project code> <date> <title>"`, so the first characters of a file name
//! identify its project. [`group_by_prefix`] uses that to give each project
//! its own directory, which is then the input of one consolidation run.

use crate::batch::is_pdf;
use crate::error::ExtractError;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest file stem kept by [`sanitize_filename`].
const MAX_FILENAME_CHARS: usize = 200;

/// Prefix length used by the `group` command when none is given.
pub const DEFAULT_PREFIX_LEN: usize = 8;

/// A PDF link found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfLink {
    pub url: String,
    /// Anchor text, tags stripped and whitespace collapsed; may be empty.
    pub title: String,
}

/// Every anchor in `html` whose target is a `.pdf`, in page order.
///
/// Relative targets are resolved against `base` when one is given.
pub fn extract_pdf_links(html: &str, base: Option<&Url>) -> Vec<PdfLink> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            if !targets_pdf(href) {
                return None;
            }

            let url = match base {
                Some(base) => base
                    .join(href)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| href.to_string()),
                None => href.to_string(),
            };
            let text = anchor.text().collect::<Vec<_>>().join(" ");
            let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
            Some(PdfLink { url, title })
        })
        .collect()
}

/// Read a saved listing page and extract its PDF links.
pub fn links_from_file(path: &Path, base: Option<&Url>) -> Result<Vec<PdfLink>, ExtractError> {
    let html = std::fs::read_to_string(path).map_err(|e| ExtractError::ReadFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let links = extract_pdf_links(&html, base);
    info!("Found {} PDF links in {}", links.len(), path.display());
    Ok(links)
}

fn targets_pdf(href: &str) -> bool {
    let path = href.split(&['?', '#'][..]).next().unwrap_or("");
    path.to_ascii_lowercase().ends_with(".pdf")
}

/// Make `name` safe as a file name: replace `< > : " / \ | ? *` with `-`
/// and keep at most 200 characters.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '-',
            other => other,
        })
        .take(MAX_FILENAME_CHARS)
        .collect()
}

/// Local file name for a link: sanitized title, else the URL's last segment.
pub fn filename_for(link: &PdfLink) -> String {
    if link.title.is_empty() {
        let segment = link
            .url
            .split(&['?', '#'][..])
            .next()
            .unwrap_or("")
            .rsplit('/')
            .next()
            .unwrap_or("");
        sanitize_filename(segment)
    } else {
        format!("{}.pdf", sanitize_filename(&link.title))
    }
}

/// Download behaviour.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-request timeout. Default: 30 s.
    pub timeout_secs: u64,
    /// Pause after each link. Default: 1000 ms.
    pub delay_ms: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            delay_ms: 1000,
        }
    }
}

/// Outcome of [`download_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSummary {
    pub total: usize,
    pub downloaded: usize,
    /// Already present locally; counted as successful.
    pub skipped: usize,
    pub failed: usize,
    pub failed_urls: Vec<String>,
}

impl FetchSummary {
    pub fn successful(&self) -> usize {
        self.downloaded + self.skipped
    }
}

/// Download every link into `dir`, one at a time.
///
/// Failures are logged and counted; there is no retry.
pub async fn download_all(
    links: &[PdfLink],
    dir: &Path,
    options: &FetchOptions,
) -> Result<FetchSummary, ExtractError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(options.timeout_secs))
        .build()
        .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))?;

    let mut summary = FetchSummary {
        total: links.len(),
        ..FetchSummary::default()
    };

    for (idx, link) in links.iter().enumerate() {
        let filename = filename_for(link);
        debug!("[{}/{}] {}", idx + 1, links.len(), link.url);

        if filename.is_empty() {
            warn!("No usable file name for {}", link.url);
            summary.failed += 1;
            summary.failed_urls.push(link.url.clone());
            continue;
        }

        let target = dir.join(&filename);
        if target.exists() {
            info!("Skipping (already exists): {}", filename);
            summary.skipped += 1;
            continue;
        }

        match download_one(&client, &link.url, &target).await {
            Ok(bytes) => {
                info!("Downloaded: {} ({} bytes)", filename, bytes);
                summary.downloaded += 1;
            }
            Err(reason) => {
                warn!("Error downloading {}: {}", filename, reason);
                summary.failed += 1;
                summary.failed_urls.push(link.url.clone());
            }
        }

        if options.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(options.delay_ms)).await;
        }
    }

    info!(
        "Download complete: {} successful, {} failed, {} total",
        summary.successful(),
        summary.failed,
        summary.total
    );
    Ok(summary)
}

/// Fetch one URL to `target` via a temp file and rename.
async fn download_one(client: &reqwest::Client, url: &str, target: &Path) -> Result<usize, String> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            format!("timed out: {e}")
        } else {
            e.to_string()
        }
    })?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }

    let bytes = response.bytes().await.map_err(|e| e.to_string())?;
    save_atomic(target, &bytes)?;
    Ok(bytes.len())
}

/// Write `bytes` to a temp file beside `target`, then rename it into place.
/// The temp file is removed if either step fails.
fn save_atomic(target: &Path, bytes: &[u8]) -> Result<(), String> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| e.to_string())?;
    tmp.write_all(bytes).map_err(|e| e.to_string())?;
    tmp.persist(target).map_err(|e| e.error.to_string())?;
    Ok(())
}

/// Files moved into one prefix directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixGroup {
    pub prefix: String,
    pub directory: PathBuf,
    pub moved: Vec<PathBuf>,
    /// Left in place because the destination already existed.
    pub skipped: Vec<PathBuf>,
}

/// Move every `*.pdf` directly in `dir` into `dir/<first prefix_len chars>/`.
///
/// Files whose name is not longer than the prefix are left where they are.
/// Groups come back sorted by prefix.
pub fn group_by_prefix(dir: &Path, prefix_len: usize) -> Result<Vec<PrefixGroup>, ExtractError> {
    if prefix_len == 0 {
        return Err(ExtractError::InvalidConfig("Prefix length must be ≥ 1".into()));
    }
    if !dir.is_dir() {
        return Err(ExtractError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|_| ExtractError::DirectoryNotFound {
        path: dir.to_path_buf(),
    })?;

    let mut by_prefix: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in entries.filter_map(|e| e.ok().map(|e| e.path())) {
        if !path.is_file() || !is_pdf(&path) {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.chars().count() <= prefix_len {
            warn!("Not grouping {}: name is not longer than the prefix", name);
            continue;
        }
        let prefix: String = name.chars().take(prefix_len).collect();
        by_prefix.entry(prefix).or_default().push(path);
    }

    info!("Found {} groups in {}", by_prefix.len(), dir.display());

    let mut groups = Vec::with_capacity(by_prefix.len());
    for (prefix, mut files) in by_prefix {
        files.sort();
        let directory = dir.join(sanitize_filename(&prefix));
        std::fs::create_dir_all(&directory).map_err(|e| ExtractError::OutputWriteFailed {
            path: directory.clone(),
            source: e,
        })?;

        let mut group = PrefixGroup {
            prefix,
            directory,
            ..PrefixGroup::default()
        };

        for file in files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let destination = group.directory.join(name);
            if destination.exists() {
                info!("Skipping {} (already exists)", destination.display());
                group.skipped.push(file);
                continue;
            }
            std::fs::rename(&file, &destination).map_err(|e| ExtractError::OutputWriteFailed {
                path: destination.clone(),
                source: e,
            })?;
            debug!("Moved {} → {}", file.display(), destination.display());
            group.moved.push(destination);
        }

        info!("{}: {} files", group.prefix, group.moved.len() + group.skipped.len());
        groups.push(group);
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LISTING: &str = r#"
        <ul>
          <li><a href="/wp-content/uploads/2024/05/KOLEA-2024-04-IVV-Report.pdf">KOLEA  IV&amp;V
              <span>April 2024</span></a></li>
          <li><a class="doc" href='https://ets.hawaii.gov/files/BMOD_2024_03.PDF'>BMOD: March / 2024</a></li>
          <li><a href="/about/">About</a></li>
          <li><a href="/files/untitled.pdf?v=2"></a></li>
        </ul>"#;

    #[test]
    fn finds_pdf_anchors_only() {
        let base = Url::parse("https://ets.hawaii.gov/reports/").unwrap();
        let links = extract_pdf_links(LISTING, Some(&base));
        assert_eq!(links.len(), 3);

        assert_eq!(
            links[0].url,
            "https://ets.hawaii.gov/wp-content/uploads/2024/05/KOLEA-2024-04-IVV-Report.pdf"
        );
        assert_eq!(links[0].title, "KOLEA IV&V April 2024");
        assert_eq!(links[1].url, "https://ets.hawaii.gov/files/BMOD_2024_03.PDF");
        assert_eq!(links[2].title, "");
    }

    #[test]
    fn entities_in_anchor_text_are_decoded() {
        let html = r#"<a href="/r/a.pdf">KOLEA &#8211; April&nbsp;2024 &rsquo;s Report</a>"#;
        let links = extract_pdf_links(html, None);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "KOLEA \u{2013} April 2024 \u{2019}s Report");
        assert_eq!(filename_for(&links[0]), "KOLEA \u{2013} April 2024 \u{2019}s Report.pdf");
    }

    #[test]
    fn angle_bracket_inside_attribute() {
        let html = r#"<a href="/r/b.pdf" title="x > y">BMOD</a><a title='a>b' href="/r/c.pdf">ESB</a>"#;
        let links = extract_pdf_links(html, None);
        let found: Vec<(&str, &str)> = links
            .iter()
            .map(|l| (l.url.as_str(), l.title.as_str()))
            .collect();
        assert_eq!(found, vec![("/r/b.pdf", "BMOD"), ("/r/c.pdf", "ESB")]);
    }

    #[test]
    fn relative_links_are_kept_without_base() {
        let links = extract_pdf_links(LISTING, None);
        assert_eq!(links[0].url, "/wp-content/uploads/2024/05/KOLEA-2024-04-IVV-Report.pdf");
    }

    #[test]
    fn sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_filename(r#"a<b>c:d"e/f\g|h?i*j"#), "a-b-c-d-e-f-g-h-i-j");
        assert_eq!(sanitize_filename(&"x".repeat(250)).chars().count(), 200);
    }

    #[test]
    fn filename_prefers_title() {
        let titled = PdfLink {
            url: "https://host/a/b.pdf".into(),
            title: "BMOD: March / 2024".into(),
        };
        assert_eq!(filename_for(&titled), "BMOD- March - 2024.pdf");

        let untitled = PdfLink {
            url: "https://host/files/untitled.pdf?v=2".into(),
            title: String::new(),
        };
        assert_eq!(filename_for(&untitled), "untitled.pdf");
    }

    #[test]
    fn grouping_moves_files_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "KOLEA 2024-01 Report.pdf",
            "KOLEA 2024-02 Report.pdf",
            "BMOD 20 2024-01.pdf",
            "tiny.pdf",
            "readme.txt",
        ] {
            fs::write(dir.path().join(name), b"%PDF").unwrap();
        }
        // A copy already present at the destination stays put.
        fs::create_dir(dir.path().join("KOLEA 20")).unwrap();
        fs::write(dir.path().join("KOLEA 20").join("KOLEA 2024-02 Report.pdf"), b"%PDF").unwrap();

        let groups = group_by_prefix(dir.path(), DEFAULT_PREFIX_LEN).unwrap();
        let prefixes: Vec<&str> = groups.iter().map(|g| g.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["BMOD 20 ", "KOLEA 20"]);

        let kolea = &groups[1];
        assert_eq!(kolea.moved.len(), 1);
        assert_eq!(kolea.skipped.len(), 1);
        assert!(dir.path().join("KOLEA 20/KOLEA 2024-01 Report.pdf").exists());
        assert!(dir.path().join("KOLEA 2024-02 Report.pdf").exists());
        assert!(dir.path().join("tiny.pdf").exists());
        assert!(dir.path().join("readme.txt").exists());
    }

    #[test]
    fn grouping_rejects_zero_prefix() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            group_by_prefix(dir.path(), 0),
            Err(ExtractError::InvalidConfig(_))
        ));
    }

    #[test]
    fn failed_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the final rename fail.
        let target = dir.path().join("KOLEA April.pdf");
        fs::create_dir(&target).unwrap();

        assert!(save_atomic(&target, b"%PDF").is_err());
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("KOLEA April.pdf")]);
    }

    #[test]
    fn save_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("BMOD.pdf");
        save_atomic(&target, b"%PDF-1.7").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"%PDF-1.7");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn existing_files_are_skipped_without_network() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("KOLEA April.pdf"), b"%PDF").unwrap();
        let links = vec![PdfLink {
            url: "http://127.0.0.1:9/never-fetched.pdf".into(),
            title: "KOLEA April".into(),
        }];
        let options = FetchOptions {
            delay_ms: 0,
            ..FetchOptions::default()
        };
        let summary = download_all(&links, dir.path(), &options).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.successful(), 1);
        assert_eq!(summary.failed, 0);
    }
}
