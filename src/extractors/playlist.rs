use serde_json::Value;

use super::json_tree;
use super::page_state;
use crate::Result;

/// Video ids referenced by a playlist page, deduplicated.
///
/// A plain set would throw away the page order; ids are kept in the order they are first seen
/// in a pre-order walk of the page data, which for a playlist page is the playlist order.
pub fn video_ids_from_page(html: &str) -> Result<Vec<String>> {
    let data = page_state::initial_data(html)?;
    Ok(video_ids_from_data(&data))
}

pub fn video_ids_from_data(data: &Value) -> Vec<String> {
    json_tree::collect_unique_strings(data, "videoId")
        .into_iter()
        .map(str::to_string)
        .collect()
}
