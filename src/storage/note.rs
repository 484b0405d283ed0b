use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed card palette. Serialized as the lowercase color word so documents
/// exported by the web version of the app import cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteColor {
    Purple,
    Green,
    Orange,
    Blue,
    Yellow,
}

pub const PALETTE: [NoteColor; 5] = [
    NoteColor::Purple,
    NoteColor::Green,
    NoteColor::Orange,
    NoteColor::Blue,
    NoteColor::Yellow,
];

impl NoteColor {
    /// Draw a color uniformly at random from the palette.
    pub fn random() -> Self {
        PALETTE[rand::thread_rng().gen_range(0..PALETTE.len())]
    }

    pub fn label(&self) -> &'static str {
        match self {
            NoteColor::Purple => "purple",
            NoteColor::Green => "green",
            NoteColor::Orange => "orange",
            NoteColor::Blue => "blue",
            NoteColor::Yellow => "yellow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub color: NoteColor,
    pub date: String,
    #[serde(rename = "hasStar", default)]
    pub has_star: bool,
}

impl Note {
    /// Create a blank note with the given id, a random color, and today's
    /// display date. The caller decides whether it ever enters the store.
    pub fn new(id: i64) -> Self {
        Note {
            id,
            title: String::new(),
            content: String::new(),
            color: NoteColor::random(),
            date: display_date(),
            has_star: false,
        }
    }
}

/// Current date in the M/D/YYYY form the exported documents carry. Display
/// and substring search only, never ordering.
pub fn display_date() -> String {
    chrono::Local::now().format("%-m/%-d/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_serializes_as_lowercase_word() {
        let json = serde_json::to_string(&NoteColor::Purple).expect("Failed to serialize color");
        assert_eq!(json, "\"purple\"");

        let color: NoteColor = serde_json::from_str("\"blue\"").expect("Failed to parse color");
        assert_eq!(color, NoteColor::Blue);
    }

    #[test]
    fn test_note_star_field_uses_document_name() {
        let mut note = Note::new(1);
        note.title = "Groceries".to_string();
        note.has_star = true;

        let json = serde_json::to_string(&note).expect("Failed to serialize note");
        assert!(json.contains("\"hasStar\":true"));
        assert!(!json.contains("has_star"));
    }

    #[test]
    fn test_note_star_defaults_to_false() {
        let json = r#"{"id":7,"title":"t","content":"c","color":"green","date":"1/2/2025"}"#;
        let note: Note = serde_json::from_str(json).expect("Failed to parse note");
        assert!(!note.has_star);
    }

    #[test]
    fn test_random_color_is_in_palette() {
        for _ in 0..50 {
            assert!(PALETTE.contains(&NoteColor::random()));
        }
    }

    #[test]
    fn test_display_date_shape() {
        let date = display_date();
        assert_eq!(date.matches('/').count(), 2);
    }
}
