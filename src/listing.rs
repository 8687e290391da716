use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::error::{MirrorError, Result};

lazy_static::lazy_static! {
    static ref REGEX_ENTRY_NAME: Regex = Regex::new(r"^[^/\\\x00]+$").unwrap();
}

/// One element of a directory listing as the contents API sends it.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(rename = "_links", default)]
    links: Option<RawLinks>,
}

#[derive(Debug, Deserialize)]
struct RawLinks {
    #[serde(rename = "self", default)]
    self_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File { download_url: String },
    Directory { self_link: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub kind: EntryKind,
}

pub type Listing = Vec<ListingEntry>;

/// A unit of work derived from one listing entry, resolved against the local
/// directory the listing is mirrored into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTask {
    File {
        name: String,
        url: String,
        path: PathBuf,
    },
    Directory {
        url: String,
        path: PathBuf,
    },
}

impl ListingEntry {
    pub fn into_task(self, base_path: &Path) -> DownloadTask {
        let path = base_path.join(&self.name);
        match self.kind {
            EntryKind::File { download_url } => DownloadTask::File {
                name: self.name,
                url: download_url,
                path,
            },
            EntryKind::Directory { self_link } => DownloadTask::Directory {
                url: self_link,
                path,
            },
        }
    }
}

/// Parses the body of a directory listing fetched from `url`.
///
/// Entries whose `type` starts with `file` are files, everything else
/// (`dir`, `symlink`, `submodule`, ...) is recursed into as a directory.
pub fn parse_listing(url: &str, body: &[u8]) -> Result<Listing> {
    let raw: Vec<RawEntry> = serde_json::from_slice(body).map_err(|source| MirrorError::Parse {
        url: url.into(),
        source,
    })?;

    raw.into_iter().map(|entry| classify(url, entry)).collect()
}

fn classify(url: &str, entry: RawEntry) -> Result<ListingEntry> {
    let invalid = |reason: String| MirrorError::InvalidEntry {
        url: url.into(),
        reason,
    };

    // names end up as path segments, so a server must not be able to escape the
    // directory it is listing
    if !REGEX_ENTRY_NAME.is_match(&entry.name) || entry.name == "." || entry.name == ".." {
        return Err(invalid(format!("unsafe entry name {:?}", entry.name)));
    }

    let kind = if entry.kind.starts_with("file") {
        let download_url = entry
            .download_url
            .ok_or_else(|| invalid(format!("file {} has no download_url", entry.name)))?;
        EntryKind::File { download_url }
    } else {
        let self_link = entry
            .links
            .and_then(|links| links.self_link)
            .ok_or_else(|| invalid(format!("directory {} has no _links.self", entry.name)))?;
        EntryKind::Directory { self_link }
    };

    Ok(ListingEntry {
        name: entry.name,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/api/v1/repos/o/r/contents";

    #[test]
    fn parse_mixed_listing() {
        let body = br#"[
            {"type": "file", "name": "a.txt", "download_url": "https://example.com/raw/a.txt",
             "_links": {"self": "https://example.com/contents/a.txt"}, "size": 3},
            {"type": "dir", "name": "sub", "download_url": null,
             "_links": {"self": "https://example.com/contents/sub"}}
        ]"#;

        let listing = parse_listing(URL, body).unwrap();

        assert_eq!(
            listing,
            vec![
                ListingEntry {
                    name: "a.txt".into(),
                    kind: EntryKind::File {
                        download_url: "https://example.com/raw/a.txt".into()
                    },
                },
                ListingEntry {
                    name: "sub".into(),
                    kind: EntryKind::Directory {
                        self_link: "https://example.com/contents/sub".into()
                    },
                },
            ]
        );
    }

    #[test]
    fn file_classification_is_a_prefix_match() {
        let body = br#"[{"type": "file-binary", "name": "blob.bin", "download_url": "https://example.com/raw/blob.bin"}]"#;

        let listing = parse_listing(URL, body).unwrap();

        assert!(matches!(listing[0].kind, EntryKind::File { .. }));
    }

    #[test]
    fn unknown_types_are_directories() {
        let body = br#"[{"type": "submodule", "name": "vendor", "_links": {"self": "https://example.com/contents/vendor"}}]"#;

        let listing = parse_listing(URL, body).unwrap();

        assert!(matches!(listing[0].kind, EntryKind::Directory { .. }));
    }

    #[test]
    fn empty_listing() {
        assert!(parse_listing(URL, b"[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_body() {
        let err = parse_listing(URL, br#"{"message": "Not Found"}"#).unwrap_err();
        assert!(matches!(err, MirrorError::Parse { .. }));
        assert_eq!(err.category(), "protocol");
    }

    #[test]
    fn missing_urls_are_rejected() {
        let file = br#"[{"type": "file", "name": "a.txt", "download_url": null}]"#;
        let dir = br#"[{"type": "dir", "name": "sub"}]"#;

        assert!(matches!(
            parse_listing(URL, file).unwrap_err(),
            MirrorError::InvalidEntry { .. }
        ));
        assert!(matches!(
            parse_listing(URL, dir).unwrap_err(),
            MirrorError::InvalidEntry { .. }
        ));
    }

    #[test]
    fn path_traversal_is_rejected() {
        for name in ["..", ".", "", "../etc", "a/b", "a\\b"] {
            let body = serde_json::json!([{
                "type": "file",
                "name": name,
                "download_url": "https://example.com/raw/x",
            }])
            .to_string();

            let err = parse_listing(URL, body.as_bytes()).unwrap_err();
            assert!(matches!(err, MirrorError::InvalidEntry { .. }), "{name:?}");
        }
    }

    #[test]
    fn entries_resolve_against_the_local_directory() {
        let entry = ListingEntry {
            name: "sub".into(),
            kind: EntryKind::Directory {
                self_link: "https://example.com/contents/sub".into(),
            },
        };

        assert_eq!(
            entry.into_task(Path::new("/tmp/root")),
            DownloadTask::Directory {
                url: "https://example.com/contents/sub".into(),
                path: PathBuf::from("/tmp/root/sub"),
            }
        );
    }
}
