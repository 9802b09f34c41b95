//! Folder listing wire types and the flattened entry shape.
//!
//! The listing endpoint returns provider-specific metadata per entry. Each
//! raw entry is flattened into a [`ListingEntry`]: shared fields are copied
//! as-is, file-only fields only when the entry is a file.

use serde::{Deserialize, Serialize};

use boxbridge_common::normalize_folder_path;

/// Discriminant of a listing entry (`.tag` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryTag {
    File,
    Folder,
    Deleted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EntryTag {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryTag::File => "file",
            EntryTag::Folder => "folder",
            EntryTag::Deleted => "deleted",
            EntryTag::Unknown => "unknown",
        }
    }
}

/// Parameters for a folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFolderRequest {
    /// Folder path in provider form (root is `""`).
    pub path: String,
    /// Include the contents of all subfolders.
    pub recursive: bool,
    /// Reserved; not sent to the provider.
    pub with_links: bool,
}

impl ListFolderRequest {
    /// Build a non-recursive request, normalizing `""` and `"/"` to root.
    pub fn new(path: &str) -> Self {
        Self {
            path: normalize_folder_path(path),
            recursive: false,
            with_links: false,
        }
    }

    /// Set the recursive flag.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set the reserved links flag.
    pub fn with_links(mut self, with_links: bool) -> Self {
        self.with_links = with_links;
        self
    }
}

/// Body of the initial listing call.
#[derive(Debug, Serialize)]
pub(crate) struct ListFolderArg<'a> {
    pub path: &'a str,
    pub recursive: bool,
    pub include_deleted: bool,
}

/// Body of a continuation call.
#[derive(Debug, Serialize)]
pub(crate) struct ListFolderContinueArg<'a> {
    pub cursor: &'a str,
}

/// One page of listing results.
#[derive(Debug, Clone, Deserialize)]
pub struct ListFolderPage {
    #[serde(default)]
    pub entries: Vec<RawEntry>,
    /// Opaque continuation marker.
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// Entry metadata as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(rename = ".tag", default)]
    pub tag: EntryTag,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub path_lower: Option<String>,
    #[serde(default)]
    pub path_display: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub server_modified: Option<String>,
    #[serde(default)]
    pub client_modified: Option<String>,
    #[serde(default)]
    pub rev: Option<String>,
}

/// File-only part of a flattened entry.
///
/// Timestamps are kept exactly as the provider wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDetails {
    pub size: Option<u64>,
    pub server_modified: Option<String>,
    pub client_modified: Option<String>,
    pub rev: Option<String>,
}

/// Simplified listing record.
///
/// `file` is populated only for `file` entries, so folders and any other
/// kind never carry size, timestamps or revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub tag: EntryTag,
    pub name: Option<String>,
    pub id: Option<String>,
    pub path_lower: Option<String>,
    pub path_display: Option<String>,
    #[serde(flatten)]
    pub file: Option<FileDetails>,
}

impl ListingEntry {
    /// Check if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.tag == EntryTag::File
    }

    /// Check if this entry is a folder.
    pub fn is_folder(&self) -> bool {
        self.tag == EntryTag::Folder
    }
}

impl From<RawEntry> for ListingEntry {
    fn from(raw: RawEntry) -> Self {
        let file = (raw.tag == EntryTag::File).then(|| FileDetails {
            size: raw.size,
            server_modified: raw.server_modified,
            client_modified: raw.client_modified,
            rev: raw.rev,
        });

        Self {
            tag: raw.tag,
            name: raw.name,
            id: raw.id,
            path_lower: raw.path_lower,
            path_display: raw.path_display,
            file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn file_json() -> serde_json::Value {
        serde_json::json!({
            ".tag": "file",
            "name": "Prime_Numbers.txt",
            "id": "id:a4ayc_80_OEAAAAAAAAAXw",
            "path_lower": "/homework/math/prime_numbers.txt",
            "path_display": "/Homework/math/Prime_Numbers.txt",
            "size": 7212,
            "client_modified": "2015-05-12T15:50:38Z",
            "server_modified": "2015-05-12T15:50:38Z",
            "rev": "a1c10ce0dd78",
            "content_hash": "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        })
    }

    #[test]
    fn test_request_normalizes_root() {
        assert_eq!(ListFolderRequest::new("").path, "");
        assert_eq!(ListFolderRequest::new("/").path, "");
        assert_eq!(ListFolderRequest::new("/Docs").path, "/Docs");

        let request = ListFolderRequest::new("/Docs").recursive(true).with_links(true);
        assert!(request.recursive);
        assert!(request.with_links);
    }

    #[test]
    fn test_file_entry_flattening() {
        let raw: RawEntry = serde_json::from_value(file_json()).unwrap();
        let entry = ListingEntry::from(raw);

        assert!(entry.is_file());
        assert_eq!(entry.name.as_deref(), Some("Prime_Numbers.txt"));
        let file = entry.file.as_ref().unwrap();
        assert_eq!(file.size, Some(7212));
        assert_eq!(file.rev.as_deref(), Some("a1c10ce0dd78"));

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["tag"], "file");
        assert_eq!(json["server_modified"], "2015-05-12T15:50:38Z");
        assert_eq!(json["client_modified"], "2015-05-12T15:50:38Z");
        assert_eq!(json["path_lower"], "/homework/math/prime_numbers.txt");
        // Fields outside the simplified shape are dropped
        assert!(json.get("content_hash").is_none());
    }

    #[test]
    fn test_file_timestamps_copied_verbatim() {
        let mut json = file_json();
        json["server_modified"] = "2015-05-12T17:50:38+02:00".into();
        json["client_modified"] = "2015-05-12 15:50:38".into();

        let raw: RawEntry = serde_json::from_value(json).unwrap();
        let entry = ListingEntry::from(raw);

        let out = serde_json::to_value(&entry).unwrap();
        assert_eq!(out["server_modified"], "2015-05-12T17:50:38+02:00");
        assert_eq!(out["client_modified"], "2015-05-12 15:50:38");
    }

    #[test]
    fn test_folder_entry_has_no_file_fields() {
        let raw: RawEntry = serde_json::from_value(serde_json::json!({
            ".tag": "folder",
            "name": "math",
            "id": "id:a4ayc_80_OEAAAAAAAAAXz",
            "path_lower": "/homework/math",
            "path_display": "/Homework/math"
        }))
        .unwrap();
        let entry = ListingEntry::from(raw);

        assert!(entry.is_folder());
        assert!(entry.file.is_none());

        let json = serde_json::to_value(&entry).unwrap();
        let object = json.as_object().unwrap();
        for key in ["size", "server_modified", "client_modified", "rev"] {
            assert!(!object.contains_key(key), "folder carried {}", key);
        }
        assert_eq!(object.len(), 5);
    }

    #[test]
    fn test_deleted_entry_keeps_only_shared_fields() {
        let raw: RawEntry = serde_json::from_value(serde_json::json!({
            ".tag": "deleted",
            "name": "old.txt",
            "path_lower": "/old.txt",
            "path_display": "/old.txt"
        }))
        .unwrap();
        let entry = ListingEntry::from(raw);

        assert_eq!(entry.tag, EntryTag::Deleted);
        assert!(entry.id.is_none());
        assert!(entry.file.is_none());
    }

    #[test]
    fn test_unrecognized_tag_passes_through() {
        let raw: RawEntry = serde_json::from_value(serde_json::json!({
            ".tag": "shortcut",
            "name": "link",
            "size": 10
        }))
        .unwrap();
        let entry = ListingEntry::from(raw);

        assert_eq!(entry.tag, EntryTag::Unknown);
        assert_eq!(entry.name.as_deref(), Some("link"));
        assert!(entry.file.is_none());
    }

    #[test]
    fn test_page_defaults() {
        let page: ListFolderPage = serde_json::from_str("{}").unwrap();
        assert!(page.entries.is_empty());
        assert!(page.cursor.is_none());
        assert!(!page.has_more);
    }

    fn arb_tag() -> impl Strategy<Value = EntryTag> {
        prop_oneof![
            Just(EntryTag::File),
            Just(EntryTag::Folder),
            Just(EntryTag::Deleted),
            Just(EntryTag::Unknown),
        ]
    }

    fn arb_timestamp() -> impl Strategy<Value = String> {
        "20[0-9]{2}-[01][0-9]-[0-2][0-9]T[01][0-9]:[0-5][0-9]:[0-5][0-9](Z|[+-]0[0-9]:[03]0)"
    }

    fn arb_raw_entry() -> impl Strategy<Value = RawEntry> {
        (
            arb_tag(),
            proptest::option::of("[a-z]{1,12}"),
            proptest::option::of("id:[A-Za-z0-9]{8}"),
            proptest::option::of(any::<u64>()),
            proptest::option::of(arb_timestamp()),
            proptest::option::of(arb_timestamp()),
            proptest::option::of("[0-9a-f]{12}"),
        )
            .prop_map(|(tag, name, id, size, server, client, rev)| RawEntry {
                tag,
                path_lower: name.as_ref().map(|n| format!("/{}", n)),
                path_display: name.as_ref().map(|n| format!("/{}", n.to_uppercase())),
                name,
                id,
                size,
                server_modified: server,
                client_modified: client,
                rev,
            })
    }

    proptest! {
        #[test]
        fn test_flatten_copies_shared_fields(raw in arb_raw_entry()) {
            let entry = ListingEntry::from(raw.clone());
            prop_assert_eq!(entry.tag, raw.tag);
            prop_assert_eq!(entry.name, raw.name);
            prop_assert_eq!(entry.id, raw.id);
            prop_assert_eq!(entry.path_lower, raw.path_lower);
            prop_assert_eq!(entry.path_display, raw.path_display);
        }

        #[test]
        fn test_flatten_file_fields_only_for_files(raw in arb_raw_entry()) {
            let entry = ListingEntry::from(raw.clone());
            if raw.tag == EntryTag::File {
                let file = entry.file.unwrap();
                prop_assert_eq!(file.size, raw.size);
                prop_assert_eq!(file.server_modified, raw.server_modified);
                prop_assert_eq!(file.client_modified, raw.client_modified);
                prop_assert_eq!(file.rev, raw.rev);
            } else {
                prop_assert!(entry.file.is_none());
            }
        }
    }
}
