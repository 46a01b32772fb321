//! Search-key cleanup for raw OCR text

/// Characters that start a trailing annotation ("Rayo, Ilustración")
const ANNOTATION_DELIMITERS: [char; 3] = [',', ':', '.'];

/// Reduce raw OCR text to a card-name search key
///
/// Keeps everything before the first `,` `:` or `.` and trims it.
pub fn normalize(text: &str) -> String {
    text.split(ANNOTATION_DELIMITERS)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
