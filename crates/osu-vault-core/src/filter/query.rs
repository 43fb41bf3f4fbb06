//! Advanced filter grammar
//!
//! A query is free text plus any number of `field(op)value` tokens, where
//! `op` is one of `=`, `!=`, `>`, `>=`, `<`, `<=` (`:` is accepted as an
//! alias for `=`) and a value may be double-quoted to include whitespace.
//! Matched tokens are stripped from the query; whatever text remains is a
//! case-insensitive substring match against the record's composed metadata.
//!
//! Token evaluation fails open: an empty value, a value that does not parse
//! as the field's type, or an unknown field never rejects the record, so a
//! malformed fragment cannot hide an entire result set.

use crate::beatmap::Beatmap;
use regex::Regex;
use std::sync::OnceLock;

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\b(?P<key>\w+)(?P<op>!?[:=]|[><][:=]?)(?P<value>"[^"]*"|\S+)"#)
            .expect("filter token pattern is valid")
    })
}

/// Either side of a comparison, typed by the record field it targets.
enum FieldValue {
    Number(f64),
    Text(String),
}

fn field_value(beatmap: &Beatmap, key: &str) -> Option<FieldValue> {
    let value = match key {
        "artist" => FieldValue::Text(beatmap.artist.clone()),
        "title" => FieldValue::Text(beatmap.title.clone()),
        "creator" | "mapper" => FieldValue::Text(beatmap.creator.clone()),
        "difficulty" => FieldValue::Text(beatmap.difficulty.clone()),
        "source" => FieldValue::Text(beatmap.source.clone()),
        "tags" => FieldValue::Text(beatmap.tags.clone()),
        "md5" => FieldValue::Text(beatmap.md5.clone()),
        "mode" => FieldValue::Text(beatmap.mode.name().to_string()),
        "status" => FieldValue::Text(beatmap.status.name().to_string()),
        "ar" => FieldValue::Number(f64::from(beatmap.ar)),
        "cs" => FieldValue::Number(f64::from(beatmap.cs)),
        "hp" => FieldValue::Number(f64::from(beatmap.hp)),
        "od" => FieldValue::Number(f64::from(beatmap.od)),
        "bpm" => FieldValue::Number(beatmap.bpm),
        "length" => FieldValue::Number(f64::from(beatmap.length)),
        "duration" => FieldValue::Number(beatmap.duration),
        "star_rating" | "stars" | "sr" => FieldValue::Number(beatmap.star_rating),
        _ => return None,
    };
    Some(value)
}

/// Map the `:` aliases onto their `=` forms.
fn normalize_op(op: &str) -> &str {
    match op {
        ":" => "=",
        "!:" => "!=",
        ">:" => ">=",
        "<:" => "<=",
        other => other,
    }
}

fn evaluate(beatmap: &Beatmap, key: &str, op: &str, raw_value: &str) -> bool {
    if raw_value.is_empty() {
        return true;
    }

    let field = match field_value(beatmap, key) {
        Some(field) => field,
        // unknown field: vacuously true
        None => return true,
    };

    match field {
        FieldValue::Number(field) => {
            let value: f64 = match raw_value.parse() {
                Ok(value) => value,
                // unparseable for a numeric field: vacuously true
                Err(_) => return true,
            };
            compare(op, field, value)
        }
        FieldValue::Text(field) => {
            let field = field.to_lowercase();
            let value = raw_value.to_lowercase();
            compare(op, field.as_str(), value.as_str())
        }
    }
}

fn compare<T: PartialOrd + PartialEq>(op: &str, field: T, value: T) -> bool {
    match normalize_op(op) {
        "=" => field == value,
        "!=" => field != value,
        ">" => field > value,
        ">=" => field >= value,
        "<" => field < value,
        "<=" => field <= value,
        _ => false,
    }
}

/// Match one record against a query string.
pub fn matches_query(beatmap: &Beatmap, query: &str) -> bool {
    let searchable = format!(
        "{} {} {} {} {}",
        beatmap.artist, beatmap.title, beatmap.difficulty, beatmap.creator, beatmap.tags
    )
    .to_lowercase();

    let mut remaining = query.to_string();

    for capture in token_regex().captures_iter(query) {
        let token = &capture[0];
        let key = &capture["key"];
        let op = &capture["op"];
        let value = capture["value"].replace('"', "");

        if !evaluate(beatmap, key, op, &value) {
            return false;
        }

        remaining = remaining.replace(token, "");
    }

    let remaining = remaining.trim().to_lowercase();
    remaining.is_empty() || searchable.contains(&remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::{GameMode, Status};

    fn beatmap() -> Beatmap {
        Beatmap {
            md5: "da8aae79c8f3306b5d65ec951874a7fb".to_string(),
            beatmapset_id: 39_804,
            artist: "Glass Beach".to_string(),
            title: "cul-de-sac".to_string(),
            creator: "flake".to_string(),
            difficulty: "the CIA presents".to_string(),
            tags: "indie emo".to_string(),
            ar: 9.3,
            cs: 4.0,
            bpm: 210.0,
            star_rating: 6.4,
            status: Status::Ranked,
            mode: GameMode::Osu,
            ..Default::default()
        }
    }

    #[test]
    fn test_free_text_substring() {
        assert!(matches_query(&beatmap(), "glass"));
        assert!(matches_query(&beatmap(), "CUL-DE"));
        assert!(matches_query(&beatmap(), "emo"));
        assert!(!matches_query(&beatmap(), "polka"));
    }

    #[test]
    fn test_empty_query_matches() {
        assert!(matches_query(&beatmap(), ""));
        assert!(matches_query(&beatmap(), "   "));
    }

    #[test]
    fn test_quoted_equality() {
        assert!(matches_query(&beatmap(), r#"artist="glass beach""#));
        assert!(!matches_query(&beatmap(), r#"artist="glass onion""#));
    }

    #[test]
    fn test_colon_alias() {
        assert!(matches_query(&beatmap(), "creator:flake"));
        assert!(!matches_query(&beatmap(), "creator:somebody"));
    }

    #[test]
    fn test_numeric_operators() {
        assert!(matches_query(&beatmap(), "ar>9"));
        assert!(matches_query(&beatmap(), "ar>=9.3"));
        assert!(!matches_query(&beatmap(), "ar>9.3"));
        assert!(matches_query(&beatmap(), "bpm<=210"));
        assert!(matches_query(&beatmap(), "sr!=5"));
        assert!(!matches_query(&beatmap(), "cs<4"));
    }

    #[test]
    fn test_tokens_stripped_from_free_text() {
        // after stripping the token, "cul" must still match as free text
        assert!(matches_query(&beatmap(), "ar>9 cul"));
        assert!(!matches_query(&beatmap(), "ar>9 polka"));
    }

    #[test]
    fn test_unknown_field_fails_open() {
        assert!(matches_query(&beatmap(), "accuracy>99"));
    }

    #[test]
    fn test_unparseable_numeric_fails_open() {
        assert!(matches_query(&beatmap(), "ar>fast"));
    }

    #[test]
    fn test_multiple_tokens_all_must_hold() {
        assert!(matches_query(&beatmap(), "ar>9 cs=4 status=ranked"));
        assert!(!matches_query(&beatmap(), "ar>9 cs=5"));
    }
}
