use crate::midi_file::{Microseconds, TranslatedNote};

/// Notes of one play-through, stored in song order.
///
/// Notes never move: index `i` is the same note for the life of the arena
/// (and matches index `i` of the file's note set), so a state change is a
/// plain field write. `live` and `history` are index lists over it.
#[derive(Debug, Clone, Default)]
pub struct NoteArena {
    notes: Vec<TranslatedNote>,
    live: Vec<usize>,
    history: Vec<usize>,
}

/// Both the sounding part and the scoring window lie before `now`.
pub fn is_elapsed(note: &TranslatedNote, half_window: Microseconds, now: Microseconds) -> bool {
    note.end < now && note.start + half_window < now
}

impl NoteArena {
    /// Notes already elapsed at `position` go straight to history.
    pub fn new(
        notes: Vec<TranslatedNote>,
        half_window: Microseconds,
        position: Microseconds,
    ) -> Self {
        let (history, live) =
            (0..notes.len()).partition(|&i| is_elapsed(&notes[i], half_window, position));
        Self {
            notes,
            live,
            history,
        }
    }

    pub fn notes(&self) -> &[TranslatedNote] {
        &self.notes
    }

    pub fn get(&self, index: usize) -> Option<&TranslatedNote> {
        self.notes.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TranslatedNote> {
        self.notes.get_mut(index)
    }

    pub fn live(&self) -> &[usize] {
        &self.live
    }

    pub fn history(&self) -> &[usize] {
        &self.history
    }

    pub fn live_notes(&self) -> impl Iterator<Item = (usize, &TranslatedNote)> + '_ {
        self.live.iter().map(move |&i| (i, &self.notes[i]))
    }

    /// The note of `track_id` with pitch `note_id` starting at `start`.
    pub fn find(&self, track_id: usize, note_id: u8, start: Microseconds) -> Option<usize> {
        let first = self.notes.partition_point(|n| n.start < start);
        self.notes[first..]
            .iter()
            .take_while(|n| n.start == start)
            .position(|n| n.track_id == track_id && n.note_id == note_id)
            .map(|offset| first + offset)
    }

    /// Visits live notes in start order; those for which `retire` returns
    /// true move to history.
    ///
    /// Stops visiting at the first note starting after `now`.
    pub fn sweep<F>(&mut self, now: Microseconds, mut retire: F)
    where
        F: FnMut(&mut TranslatedNote) -> bool,
    {
        let mut kept = Vec::with_capacity(self.live.len());
        let mut rest = self.live.iter().copied();

        for index in rest.by_ref() {
            let note = &mut self.notes[index];
            let later = note.start > now;
            if !later && retire(note) {
                self.history.push(index);
            } else {
                kept.push(index);
            }
            if later {
                break;
            }
        }
        kept.extend(rest);
        self.live = kept;
    }
}
