use crate::service::transfer::{self, TransferError};
use crate::storage::note::{Note, NoteColor};
use crate::storage::slot::StorageSlot;
use anyhow::Result;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long the transient insert/delete markers stay live. Visual sequencing
/// only; zero leaves every observable end state unchanged.
pub const ANIMATION_DELAY: Duration = Duration::from_millis(300);

struct PendingDelete {
    id: i64,
    deadline: Instant,
}

/// The authoritative, ordered note collection. Every mutation rewrites the
/// storage slot; a write failure downgrades the session to in-memory-only
/// instead of failing the mutation.
pub struct NoteStore {
    notes: Vec<Note>,
    slot: StorageSlot,
    animation_delay: Duration,
    last_issued_id: i64,
    inserted: Option<(i64, Instant)>,
    pending_deletes: Vec<PendingDelete>,
    degraded: bool,
}

impl NoteStore {
    /// Initialize from the slot; absence or corruption reads as an empty
    /// collection.
    pub fn open(slot: StorageSlot, animation_delay: Duration) -> Self {
        let notes = slot.load();
        let last_issued_id = notes.iter().map(|n| n.id).max().unwrap_or(0);

        NoteStore {
            notes,
            slot,
            animation_delay,
            last_issued_id,
            inserted: None,
            pending_deletes: Vec::new(),
            degraded: false,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn journal_path(&self) -> &std::path::Path {
        self.slot.path()
    }

    pub fn get(&self, id: i64) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Produce a fresh blank note. Not inserted; insertion happens only on a
    /// confirmed save.
    pub fn create(&mut self) -> Note {
        Note::new(self.next_id())
    }

    // Wall-clock milliseconds, bumped past the last issued id so notes
    // created in the same millisecond stay unique within the session.
    fn next_id(&mut self) -> i64 {
        let mut id = chrono::Local::now().timestamp_millis();
        if id <= self.last_issued_id {
            id = self.last_issued_id + 1;
        }
        self.last_issued_id = id;
        id
    }

    /// Replace an existing note in place, or prepend a new one with a fresh
    /// random color. A note that is blank on both fields is a cancelled
    /// save, not a creation.
    pub fn save(&mut self, note: Note) {
        if note.title.trim().is_empty() && note.content.trim().is_empty() {
            return;
        }

        if let Some(existing) = self.notes.iter_mut().find(|n| n.id == note.id) {
            *existing = note;
        } else {
            let mut note = note;
            note.color = NoteColor::random();
            self.last_issued_id = self.last_issued_id.max(note.id);
            self.inserted = Some((note.id, Instant::now() + self.animation_delay));
            self.notes.insert(0, note);
        }
        self.persist();
    }

    /// Mark the note for its removal animation; `tick` removes it once the
    /// deadline passes. Unknown ids are ignored.
    pub fn delete(&mut self, id: i64) {
        if self.get(id).is_some() && !self.is_pending_delete(id) {
            self.pending_deletes.push(PendingDelete {
                id,
                deadline: Instant::now() + self.animation_delay,
            });
        }
    }

    pub fn toggle_star(&mut self, id: i64) {
        if let Some(note) = self.notes.iter_mut().find(|n| n.id == id) {
            note.has_star = !note.has_star;
            self.persist();
        }
    }

    /// Append the imported notes, then dedupe by id: for each duplicate id
    /// the entry appearing later in the concatenated sequence wins, at the
    /// earlier entry's position. The id allocator is advanced past every
    /// imported id so later creations cannot collide.
    pub fn merge_import(&mut self, incoming: Vec<Note>) {
        let mut merged: Vec<Note> = Vec::with_capacity(self.notes.len() + incoming.len());
        let mut index_of: HashMap<i64, usize> = HashMap::new();

        for note in self.notes.drain(..).chain(incoming) {
            self.last_issued_id = self.last_issued_id.max(note.id);
            match index_of.get(&note.id) {
                Some(&i) => merged[i] = note,
                None => {
                    index_of.insert(note.id, merged.len());
                    merged.push(note);
                }
            }
        }

        self.notes = merged;
        self.persist();
    }

    /// Exact JSON round trip of the ordered collection.
    pub fn serialize(&self) -> Result<String> {
        transfer::export_document(&self.notes)
    }

    /// Parse a serialized collection without touching any store. Malformed
    /// input is a typed error.
    pub fn deserialize(text: &str) -> Result<Vec<Note>, TransferError> {
        transfer::parse_document(text)
    }

    /// Advance the transient deadlines: clear the expired insert marker and
    /// finalize expired deletions. Returns true when the collection changed.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> bool {
        if let Some((_, deadline)) = self.inserted {
            if now >= deadline {
                self.inserted = None;
            }
        }

        let expired: Vec<i64> = self
            .pending_deletes
            .iter()
            .filter(|p| now >= p.deadline)
            .map(|p| p.id)
            .collect();
        if expired.is_empty() {
            return false;
        }

        self.pending_deletes.retain(|p| now < p.deadline);
        self.notes.retain(|n| !expired.contains(&n.id));
        self.persist();
        true
    }

    /// The most-recently-inserted id, while its animation window is open.
    pub fn animating_insert(&self) -> Option<i64> {
        self.inserted.map(|(id, _)| id)
    }

    pub fn is_pending_delete(&self, id: i64) -> bool {
        self.pending_deletes.iter().any(|p| p.id == id)
    }

    /// True once a slot write has failed; the session continues in memory.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn persist(&mut self) {
        if self.slot.save(&self.notes).is_err() {
            self.degraded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::note::PALETTE;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn test_store(dir: &std::path::Path) -> NoteStore {
        NoteStore::open(StorageSlot::new(dir), Duration::ZERO)
    }

    fn titled(mut note: Note, title: &str) -> Note {
        note.title = title.to_string();
        note
    }

    #[test]
    fn test_created_ids_are_unique() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let mut seen = HashSet::new();
        for i in 0..20 {
            let note = titled(store.create(), &format!("note {}", i));
            assert!(seen.insert(note.id), "duplicate id {}", note.id);
            store.save(note);
        }
        assert_eq!(store.notes().len(), 20);
    }

    #[test]
    fn test_blank_save_is_a_cancellation() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let note = store.create();
        store.save(note);
        assert!(store.notes().is_empty());

        let mut note = store.create();
        note.title = "   ".to_string();
        note.content = "\n".to_string();
        store.save(note);
        assert!(store.notes().is_empty());
    }

    #[test]
    fn test_new_notes_prepend_and_mark_animation() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let first = titled(store.create(), "first");
        store.save(first);
        let second = titled(store.create(), "second");
        let second_id = second.id;
        store.save(second);

        assert_eq!(store.notes()[0].title, "second");
        assert_eq!(store.notes()[1].title, "first");
        assert_eq!(store.animating_insert(), Some(second_id));

        store.tick();
        assert_eq!(store.animating_insert(), None);
    }

    #[test]
    fn test_save_existing_replaces_in_place() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let one = titled(store.create(), "one");
        store.save(one);
        let two = titled(store.create(), "two");
        let two_id = two.id;
        let two_color = {
            store.save(two);
            store.get(two_id).expect("note missing").color
        };

        let mut edited = store.get(two_id).expect("note missing").clone();
        edited.content = "edited body".to_string();
        store.save(edited);

        // Position, id, and color are all unchanged by a re-save.
        assert_eq!(store.notes()[1].id, two_id);
        assert_eq!(store.notes()[1].content, "edited body");
        assert_eq!(store.notes()[1].color, two_color);
        assert_eq!(store.notes().len(), 2);
    }

    #[test]
    fn test_save_assigns_color_from_palette() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let note = titled(store.create(), "colored");
        store.save(note);
        assert!(PALETTE.contains(&store.notes()[0].color));
    }

    #[test]
    fn test_delete_is_pending_until_tick() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let note = titled(store.create(), "doomed");
        let id = note.id;
        store.save(note);

        store.delete(id);
        assert!(store.is_pending_delete(id));
        assert_eq!(store.notes().len(), 1);

        assert!(store.tick());
        assert!(store.notes().is_empty());
        assert!(!store.is_pending_delete(id));
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        store.delete(12345);
        assert!(!store.tick());
    }

    #[test]
    fn test_toggle_star_twice_restores() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let note = titled(store.create(), "starred");
        let id = note.id;
        store.save(note);

        store.toggle_star(id);
        assert!(store.get(id).expect("note missing").has_star);
        store.toggle_star(id);
        assert!(!store.get(id).expect("note missing").has_star);

        // Unknown id: nothing to flip, nothing panics.
        store.toggle_star(id + 1);
    }

    #[test]
    fn test_merge_duplicate_id_later_entry_wins() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let a = titled(store.create(), "original");
        let a_id = a.id;
        store.save(a);

        let mut b = store.get(a_id).expect("note missing").clone();
        b.title = "imported".to_string();
        b.color = NoteColor::Blue;
        store.merge_import(vec![b.clone()]);

        assert_eq!(store.notes().len(), 1);
        assert_eq!(store.notes()[0], b);
    }

    #[test]
    fn test_merge_duplicates_within_import() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let mut a = Note::new(99);
        a.title = "first copy".to_string();
        let mut b = Note::new(99);
        b.title = "second copy".to_string();

        store.merge_import(vec![a, b.clone()]);
        assert_eq!(store.notes().len(), 1);
        assert_eq!(store.notes()[0], b);
    }

    #[test]
    fn test_merge_disjoint_grows_by_import_count() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let existing = titled(store.create(), "existing");
        store.save(existing);

        let mut x = Note::new(1);
        x.title = "x".to_string();
        let mut y = Note::new(2);
        y.title = "y".to_string();
        store.merge_import(vec![x, y]);

        assert_eq!(store.notes().len(), 3);
    }

    #[test]
    fn test_merge_advances_id_allocator() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let mut imported = Note::new(i64::MAX - 1);
        imported.title = "from the future".to_string();
        store.merge_import(vec![imported]);

        let fresh = store.create();
        assert_eq!(fresh.id, i64::MAX);
    }

    #[test]
    fn test_serialize_deserialize_round_trip() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());

        let mut unicode = titled(store.create(), "G\u{fc}nl\u{fc}k \u{1f4d3}");
        unicode.content = String::new();
        store.save(unicode);
        let mut starred = titled(store.create(), "starred");
        starred.content = "body".to_string();
        starred.has_star = true;
        store.save(starred);

        let text = store.serialize().expect("Failed to serialize");
        let parsed = NoteStore::deserialize(&text).expect("Failed to deserialize");
        assert_eq!(parsed, store.notes());
    }

    #[test]
    fn test_deserialize_failure_is_typed_and_harmless() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = test_store(dir.path());
        let kept = titled(store.create(), "kept");
        store.save(kept);

        assert!(NoteStore::deserialize("not json").is_err());
        assert_eq!(store.notes().len(), 1);
    }

    #[test]
    fn test_collection_survives_reopen() {
        let dir = tempdir().expect("Failed to create temp dir");

        let mut store = test_store(dir.path());
        let durable = titled(store.create(), "durable");
        store.save(durable);
        let saved = store.notes().to_vec();
        drop(store);

        let reopened = test_store(dir.path());
        assert_eq!(reopened.notes(), saved);
    }

    #[test]
    fn test_reopen_resumes_id_allocation_past_stored_ids() {
        let dir = tempdir().expect("Failed to create temp dir");

        let mut store = test_store(dir.path());
        let mut note = store.create();
        note.id = i64::MAX - 1;
        note.title = "clock skew".to_string();
        store.save(note);
        drop(store);

        let mut reopened = test_store(dir.path());
        assert_eq!(reopened.create().id, i64::MAX);
    }
}
