//! YouTube video-reference parsing and validation.
//!
//! Admins paste whatever they have at hand: a bare video ID, a watch URL, a
//! share link, or the full `<iframe>` embed snippet copied from YouTube. This
//! module normalizes all of those into the canonical 11-character video ID.
//!
//! Patterns are tried in a fixed priority order and the first one that yields
//! an ID wins. Matching is case-sensitive on the host, and only the 11
//! characters following a marker are inspected.

/// Length of a canonical YouTube video ID.
pub const VIDEO_ID_LEN: usize = 11;

/// Embed marker, as found in iframe snippets and embed URLs.
const EMBED_MARKER: &str = "youtube.com/embed/";

/// Watch, short-link, and legacy `/v/` markers. The leftmost hit wins.
const URL_PATH_MARKERS: [&str; 3] = ["youtube.com/watch?v=", "youtu.be/", "youtube.com/v/"];

/// Prefix for the generic `?...&v=` query form.
const YOUTUBE_PATH: &str = "youtube.com/";

/// Extract a canonical video ID from a raw ID, URL, or iframe embed snippet.
///
/// Returns `None` when no supported pattern matches.
///
/// # Example
/// ```
/// use livecast_models::video_ref::extract_video_id;
///
/// assert_eq!(
///     extract_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
///     Some("dQw4w9WgXcQ")
/// );
/// assert_eq!(extract_video_id("not a url"), None);
/// ```
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    if is_valid_video_id(input) {
        return Some(input.to_string());
    }

    extract_from_embed(input)
        .or_else(|| extract_from_url_path(input))
        .or_else(|| extract_from_query_param(input))
        .map(str::to_string)
}

/// Check that `id` has the canonical shape: exactly 11 characters drawn from
/// `[A-Za-z0-9_-]`.
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN && id.bytes().all(is_video_id_byte)
}

/// Thumbnail URL derived from a video ID.
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video_id)
}

/// Canonical watch URL for a video ID.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Embed URL consumed by the player widget.
pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}

fn is_video_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// The 11 ID characters starting at byte offset `start`, if they are all valid.
fn id_at(haystack: &str, start: usize) -> Option<&str> {
    let candidate = haystack.get(start..start + VIDEO_ID_LEN)?;
    candidate.bytes().all(is_video_id_byte).then_some(candidate)
}

/// `youtube.com/embed/<id>`, anywhere in the input (iframe snippets included).
fn extract_from_embed(input: &str) -> Option<&str> {
    input
        .match_indices(EMBED_MARKER)
        .find_map(|(pos, marker)| id_at(input, pos + marker.len()))
}

/// `youtube.com/watch?v=<id>`, `youtu.be/<id>`, or `youtube.com/v/<id>`.
fn extract_from_url_path(input: &str) -> Option<&str> {
    URL_PATH_MARKERS
        .iter()
        .flat_map(|marker| {
            input
                .match_indices(marker)
                .filter_map(move |(pos, m)| id_at(input, pos + m.len()).map(|id| (pos, id)))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, id)| id)
}

/// `youtube.com/<anything>[?&]v=<id>`.
///
/// The filler between the host and the parameter never spans a line break,
/// and the last qualifying `v=` on that line is taken.
fn extract_from_query_param(input: &str) -> Option<&str> {
    let mut search_from = 0;

    while let Some(offset) = input[search_from..].find(YOUTUBE_PATH) {
        let host_start = search_from + offset;
        let after_host = host_start + YOUTUBE_PATH.len();
        let line_end = input[after_host..]
            .find('\n')
            .map_or(input.len(), |i| after_host + i);
        let line = &input[after_host..line_end];

        let hit = line.rmatch_indices("v=").find_map(|(pos, _)| {
            let separator = pos.checked_sub(1)?;
            match line.as_bytes()[separator] {
                b'?' | b'&' => id_at(line, pos + 2),
                _ => None,
            }
        });

        if hit.is_some() {
            return hit;
        }

        search_from = host_start + 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RICK: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_extract_from_supported_formats() {
        let cases = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ&list=PLrAXtmRdnEQy4qtr",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=30&feature=share",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "<iframe src=\"https://www.youtube.com/embed/dQw4w9WgXcQ\">",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://m.youtube.com/live/abc?si=x&v=dQw4w9WgXcQ",
            "   dQw4w9WgXcQ   ",
        ];

        for case in cases {
            assert_eq!(extract_video_id(case).as_deref(), Some(RICK), "input: {case}");
        }
    }

    #[test]
    fn test_full_iframe_snippet() {
        let snippet = r#"<iframe width="560" height="315"
            src="https://www.youtube.com/embed/dQw4w9WgXcQ?si=abc"
            title="YouTube video player" frameborder="0" allowfullscreen></iframe>"#;
        assert_eq!(extract_video_id(snippet).as_deref(), Some(RICK));
    }

    #[test]
    fn test_unmatched_inputs() {
        for case in [
            "not a url",
            "",
            "   ",
            "short",
            "https://vimeo.com/123456789",
            "https://youtube.com",
            "https://youtu.be/",
            "https://youtube.com/watch?v=abc123",
            "https://youtube.com/watch?v=abc!!def456",
        ] {
            assert_eq!(extract_video_id(case), None, "input: {case}");
        }
    }

    #[test]
    fn test_embed_pattern_takes_priority() {
        let input = "https://youtu.be/AAAAAAAAAAA https://www.youtube.com/embed/BBBBBBBBBBB";
        assert_eq!(extract_video_id(input).as_deref(), Some("BBBBBBBBBBB"));
    }

    #[test]
    fn test_leftmost_url_path_wins() {
        let input = "https://www.youtube.com/v/BBBBBBBBBBB then https://youtu.be/AAAAAAAAAAA";
        assert_eq!(extract_video_id(input).as_deref(), Some("BBBBBBBBBBB"));
    }

    #[test]
    fn test_query_param_takes_last_match_on_line() {
        let input = "https://www.youtube.com/playlist?v=AAAAAAAAAAA&v=BBBBBBBBBBB";
        assert_eq!(extract_video_id(input).as_deref(), Some("BBBBBBBBBBB"));
    }

    #[test]
    fn test_query_param_does_not_cross_lines() {
        let input = "https://www.youtube.com/playlist\n?v=AAAAAAAAAAA";
        assert_eq!(extract_video_id(input), None);
    }

    #[test]
    fn test_only_eleven_characters_are_read() {
        // Characters after the ID are not inspected once a marker matched.
        assert_eq!(
            extract_video_id("https://youtu.be/abc123def456789").as_deref(),
            Some("abc123def45")
        );
    }

    #[test]
    fn test_host_is_case_sensitive() {
        assert_eq!(extract_video_id("https://YOUTU.BE/dQw4w9WgXcQ"), None);
    }

    #[test]
    fn test_is_valid_video_id() {
        assert!(is_valid_video_id(RICK));
        assert!(is_valid_video_id("a-b_c-d_e-f"));
        assert!(!is_valid_video_id("short"));
        assert!(!is_valid_video_id("dQw4w9WgXcQQ"));
        assert!(!is_valid_video_id("dQw4w9WgXc!"));
        assert!(!is_valid_video_id(" dQw4w9WgXc"));
        assert!(!is_valid_video_id("dQw4w9WgXcé"));
    }

    #[test]
    fn test_derived_urls() {
        assert_eq!(
            thumbnail_url(RICK),
            "https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
        );
        assert_eq!(watch_url(RICK), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(embed_url(RICK), "https://www.youtube.com/embed/dQw4w9WgXcQ");
    }

    proptest! {
        #[test]
        fn canonical_ids_pass_through_unchanged(id in "[A-Za-z0-9_-]{11}") {
            prop_assert!(is_valid_video_id(&id));
            prop_assert_eq!(extract_video_id(&id), Some(id.clone()));
        }

        #[test]
        fn extracted_ids_are_always_canonical(input in "\\PC{0,80}") {
            if let Some(id) = extract_video_id(&input) {
                prop_assert!(is_valid_video_id(&id));
            }
        }

        #[test]
        fn watch_urls_round_trip(id in "[A-Za-z0-9_-]{11}") {
            prop_assert_eq!(extract_video_id(&watch_url(&id)), Some(id.clone()));
            prop_assert_eq!(extract_video_id(&embed_url(&id)), Some(id));
        }
    }
}
