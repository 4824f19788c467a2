use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::{DigestError, Result};

/// The three kinds of reference a user may hand in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Channel,
    Playlist,
    Video,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Channel => "channel",
            ReferenceKind::Playlist => "playlist",
            ReferenceKind::Video => "video",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static CHANNEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/@([a-zA-Z0-9_-]+)")
        .expect("channel pattern is valid")
});
static PLAYLIST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/playlist\?list=([a-zA-Z0-9_-]+)")
        .expect("playlist pattern is valid")
});
static VIDEO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([a-zA-Z0-9_-]+)")
        .expect("video pattern is valid")
});

/// Map a raw reference onto its kind and identifier.
///
/// Patterns are tried in a fixed order (channel handle, playlist list, watch video) and the
/// first match wins. Only the start of the input is anchored, so trailing query parameters
/// are ignored. No I/O happens here.
pub fn classify(reference: &str) -> Result<(ReferenceKind, String)> {
    let patterns: [(ReferenceKind, &Regex); 3] = [
        (ReferenceKind::Channel, &CHANNEL_PATTERN),
        (ReferenceKind::Playlist, &PLAYLIST_PATTERN),
        (ReferenceKind::Video, &VIDEO_PATTERN),
    ];

    for (kind, pattern) in patterns {
        if let Some(id) = pattern.captures(reference).and_then(|c| c.get(1)) {
            tracing::debug!("Classified {} as {} ({})", reference, kind, id.as_str());
            return Ok((kind, id.as_str().to_string()));
        }
    }

    Err(DigestError::InvalidUrl(reference.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_channel_handle() {
        let (kind, id) = classify("https://www.youtube.com/@some_Channel-1").unwrap();
        assert_eq!(kind, ReferenceKind::Channel);
        assert_eq!(id, "some_Channel-1");

        let (kind, id) = classify("youtube.com/@handle/videos").unwrap();
        assert_eq!(kind, ReferenceKind::Channel);
        assert_eq!(id, "handle");
    }

    #[test]
    fn test_classify_playlist() {
        let (kind, id) =
            classify("https://www.youtube.com/playlist?list=PLabc123_-XYZ").unwrap();
        assert_eq!(kind, ReferenceKind::Playlist);
        assert_eq!(id, "PLabc123_-XYZ");
    }

    #[test]
    fn test_classify_video_ignores_extra_parameters() {
        let (kind, id) = classify("http://youtube.com/watch?v=dQw4w9WgXcQ&t=42s").unwrap();
        assert_eq!(kind, ReferenceKind::Video);
        assert_eq!(id, "dQw4w9WgXcQ");
    }

    #[test]
    fn test_classify_rejects_unknown_shapes() {
        for reference in [
            "",
            "not a url",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://vimeo.com/12345",
            "https://www.youtube.com/watch?list=PL1&v=abc",
            "see https://www.youtube.com/watch?v=abc",
        ] {
            let err = classify(reference).unwrap_err();
            assert_eq!(
                err.downcast_ref::<DigestError>(),
                Some(&DigestError::InvalidUrl(reference.to_string())),
                "{reference:?} should not classify"
            );
        }
    }
}
