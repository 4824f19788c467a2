/// Split `text` into chunks of whole lines, each below `max_chunk_size` characters.
///
/// Lines are accumulated while `len(current) + len(line) + 1 < max_chunk_size`; on overflow the
/// current chunk is trimmed and closed and the line starts a new one. A line is never broken,
/// so a line longer than the limit becomes its own oversized chunk. Lengths are counted in
/// characters.
pub fn split_text(text: &str, max_chunk_size: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if current_len + line_len + 1 < max_chunk_size {
            current.push_str(line);
            current.push('\n');
            current_len += line_len + 1;
        } else {
            if !current.is_empty() {
                chunks.push(current.trim().to_string());
            }
            current = format!("{}\n", line);
            current_len = line_len + 1;
        }
    }

    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Sanitize filename for safe file system usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' => c,
            _ => '_',
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// Shorten `text` to at most `max_chars` characters, marking the cut with an ellipsis
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
