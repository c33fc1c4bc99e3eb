//! Response shapes of the Emby REST API. Every field is optional so a partial
//! entry never fails the whole response.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamedEntry {
    pub name: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaFolders {
    pub items: Vec<NamedEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemsResponse {
    pub items: Vec<ItemDto>,
    pub total_record_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemDto {
    pub id: Option<String>,
    pub name: Option<String>,
    pub original_title: Option<String>,
    pub date_created: Option<String>,
    pub image_tags: HashMap<String, String>,
    pub series_id: Option<String>,
    pub series_name: Option<String>,
    pub series_primary_image_tag: Option<String>,
}

impl ItemDto {
    pub fn primary_image_tag(&self) -> Option<&str> {
        self.image_tags.get("Primary").map(String::as_str)
    }
}

/// Builds a name → id map, skipping entries that lack either field.
pub fn name_to_id(entries: Vec<NamedEntry>) -> HashMap<String, String> {
    entries
        .into_iter()
        .filter_map(|entry| Some((entry.name?, entry.id?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_to_id_skips_incomplete_entries() {
        let users: Vec<NamedEntry> = serde_json::from_str(
            r#"[
                {"Name": "alice", "Id": "u1"},
                {"Name": "nobody"},
                {"Id": "u3"},
                {"Name": "bob", "Id": "u2", "HasPassword": true}
            ]"#,
        )
        .unwrap();

        let map = name_to_id(users);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("alice"), Some(&"u1".to_string()));
        assert_eq!(map.get("bob"), Some(&"u2".to_string()));
    }

    #[test]
    fn test_items_response_defaults() {
        let response: ItemsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.items.is_empty());
        assert_eq!(response.total_record_count, None);
    }

    #[test]
    fn test_item_primary_tag() {
        let item: ItemDto = serde_json::from_str(
            r#"{"Id": "i1", "Name": "Film", "ImageTags": {"Primary": "abc", "Logo": "def"}}"#,
        )
        .unwrap();
        assert_eq!(item.primary_image_tag(), Some("abc"));

        let bare: ItemDto = serde_json::from_str(r#"{"Id": "i2"}"#).unwrap();
        assert_eq!(bare.primary_image_tag(), None);
    }
}
