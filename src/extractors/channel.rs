use serde_json::Value;

use super::json_tree::dedup_first_seen;
use super::{page_state, PlaylistDescriptor};
use crate::Result;

/// URL of a channel's playlists tab
pub fn playlists_url(handle: &str) -> String {
    format!(
        "https://www.youtube.com/@{}/playlists",
        urlencoding::encode(handle)
    )
}

/// Playlists listed on a channel's playlists page, deduplicated by id in page order.
pub fn playlists_from_page(html: &str) -> Result<Vec<PlaylistDescriptor>> {
    let data = page_state::initial_data(html)?;
    Ok(playlists_from_data(&data))
}

/// Walk tabs → section list → item sections → grid items and read the first grid that holds
/// playlist lockups. Later sections are ignored once one grid yields playlists.
pub fn playlists_from_data(data: &Value) -> Vec<PlaylistDescriptor> {
    let tabs = data
        .pointer("/contents/twoColumnBrowseResultsRenderer/tabs")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for tab in tabs {
        let sections = array_at(tab, "/tabRenderer/content/sectionListRenderer/contents");

        for section in sections {
            for item in array_at(section, "/itemSectionRenderer/contents") {
                let grid_items = array_at(item, "/gridRenderer/items");
                if !grid_items.iter().any(|g| g.get("lockupViewModel").is_some()) {
                    continue;
                }

                let playlists = grid_items.iter().filter_map(playlist_from_lockup);
                return dedup_by_id(playlists);
            }
        }
    }

    Vec::new()
}

fn playlist_from_lockup(grid_item: &Value) -> Option<PlaylistDescriptor> {
    let lockup = grid_item.get("lockupViewModel")?;
    let id = lockup.get("contentId").and_then(Value::as_str).unwrap_or("");
    let title = lockup
        .pointer("/metadata/lockupMetadataViewModel/title/content")
        .and_then(Value::as_str)
        .unwrap_or("");

    if id.is_empty() || title.is_empty() {
        return None;
    }
    Some(PlaylistDescriptor::new(id, title))
}

fn dedup_by_id(playlists: impl Iterator<Item = PlaylistDescriptor>) -> Vec<PlaylistDescriptor> {
    let playlists: Vec<PlaylistDescriptor> = playlists.collect();
    let unique_ids = dedup_first_seen(playlists.iter().map(|p| p.id.as_str()));

    unique_ids
        .into_iter()
        .filter_map(|id| playlists.iter().find(|p| p.id == id).cloned())
        .collect()
}

fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
