use std::path::PathBuf;

/// Characters of the prompt sentence that make it into a file name.
pub const SENTENCE_SLUG_CHARS: usize = 50;

/// URL- and file-system-safe form of `text`.
///
/// German umlauts and ß are transliterated, anything outside `[a-z0-9]` is
/// dropped, and runs of whitespace, `_` or `-` become a single `-`.
pub fn slugify(text: &str) -> String {
    let mut transliterated = String::with_capacity(text.len());
    for c in text.trim().to_lowercase().chars() {
        match c {
            'ä' => transliterated.push_str("ae"),
            'ö' => transliterated.push_str("oe"),
            'ü' => transliterated.push_str("ue"),
            'ß' => transliterated.push_str("ss"),
            c if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c.is_whitespace() => {
                transliterated.push(c)
            }
            _ => {}
        }
    }

    let mut slug = String::with_capacity(transliterated.len());
    let mut in_separator = false;
    for c in transliterated.chars() {
        if c == '-' || c == '_' || c.is_whitespace() {
            in_separator = true;
            continue;
        }
        if in_separator && !slug.is_empty() {
            slug.push('-');
        }
        in_separator = false;
        slug.push(c);
    }
    slug
}

/// `{emotion}_{slug of the first 50 sentence characters}.wav`
pub fn recording_file_name(emotion: &str, sentence: &str) -> String {
    let head: String = sentence.chars().take(SENTENCE_SLUG_CHARS).collect();
    format!("{}_{}.wav", emotion.to_lowercase(), slugify(&head))
}

/// Storage key of a recording: `{user_id}/{emotion}/{file_name}`.
pub fn recording_path(user_id: &str, emotion: &str, file_name: &str) -> PathBuf {
    [user_id, &emotion.to_lowercase(), file_name].iter().collect()
}
