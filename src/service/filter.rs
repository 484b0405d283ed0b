use crate::storage::note::{Note, NoteColor};
use regex::RegexBuilder;

/// Derive the visible subset of the collection for the active sidebar
/// filters and search query, preserving store order. Pure; the store is
/// never touched.
pub fn visible<'a>(
    notes: &'a [Note],
    active_color: Option<NoteColor>,
    favorites_only: bool,
    query: &str,
) -> Vec<&'a Note> {
    notes
        .iter()
        .filter(|note| {
            (!favorites_only || note.has_star)
                && active_color.map_or(true, |color| note.color == color)
                && matches_query(note, query)
        })
        .collect()
}

/// Substring checks on title, content, and date come first; a regex match
/// over title and content is an additive OR on top of them.
fn matches_query(note: &Note, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    let needle = query.to_lowercase();
    if note.title.to_lowercase().contains(&needle)
        || note.content.to_lowercase().contains(&needle)
        || note.date.to_lowercase().contains(&needle)
    {
        return true;
    }

    regex_matches(query, &format!("{} {}", note.title, note.content))
}

// A query that is not a valid pattern contributes "no regex match", never an
// error; the substring arms above have already had their say.
fn regex_matches(pattern: &str, haystack: &str) -> bool {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(haystack),
        Err(_) => false,
    }
}
