/// Longest provider body excerpt we ever put in a log line.
pub const MAX_SNIPPET_CHARS: usize = 300;

/// Shortens an upstream response body for diagnostics.
///
/// Control characters are dropped so a hostile body cannot forge log lines,
/// and the cut happens on a char boundary.
pub fn snippet(body: &str, max_chars: usize) -> String {
    body.chars()
        .filter(|c| !c.is_control())
        .take(max_chars)
        .collect()
}
