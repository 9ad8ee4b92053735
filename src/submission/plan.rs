//! In-memory item/bitstream plan helpers: parsing the pieces of a
//! submission message body that `Submission::submit` turns into repository
//! calls.

use serde_json::Value;

use crate::repository::MetadataEntry;

/// A single entry from the input message's `Files` array, resolved into
/// the fields `Submission::submit` needs. Parsing happens lazily during
/// `submit`, not during `Submission::from_message`, because a malformed
/// file descriptor is a `BitstreamAddError` (report-continue), not a
/// nonconforming-body rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub bitstream_name: String,
    pub file_location: String,
    pub bitstream_description: Option<String>,
}

impl FileDescriptor {
    /// Parse one `Files` entry. Returns `None` if either required key is
    /// missing or not a string.
    pub fn from_json(value: &Value) -> Option<Self> {
        let bitstream_name = value.get("BitstreamName")?.as_str()?.to_string();
        let file_location = value.get("FileLocation")?.as_str()?.to_string();
        let bitstream_description = value
            .get("BitstreamDescription")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Some(Self {
            bitstream_name,
            file_location,
            bitstream_description,
        })
    }
}

/// Parse the `metadata` array out of a fetched metadata document. Returns
/// `None` if the document isn't an object with a `metadata` array, or any
/// entry is missing `key`/`value`.
pub fn parse_metadata_entries(doc: &Value) -> Option<Vec<MetadataEntry>> {
    let entries = doc.get("metadata")?.as_array()?;
    let mut result = Vec::with_capacity(entries.len());
    for entry in entries {
        let key = entry.get("key")?.as_str()?.to_string();
        let value = entry.get("value")?.as_str()?.to_string();
        let language = entry
            .get("language")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        result.push(MetadataEntry { key, value, language });
    }
    Some(result)
}
