/// Normalise raw OCR output into a single line of text.
///
/// Lines are trimmed, empty lines dropped, and every run of whitespace
/// collapsed to one space. Returns an empty string when nothing is left.
pub fn clean_extracted_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
