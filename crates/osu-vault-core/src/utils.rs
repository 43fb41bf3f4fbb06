//! Utility functions shared across modules.

/// Sanitize a string for use as a filename by replacing invalid characters.
///
/// Replaces `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|` with underscores and
/// trims surrounding whitespace.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
