// src/utils/html.rs

/// Sanitizes admin-authored quiz text with a tag whitelist.
///
/// Safe formatting tags (like <b>, <p>) survive; <script>, <iframe> and
/// event-handler attributes are stripped along with script bodies.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
