use std::collections::{BTreeMap, HashMap};

use super::beatmap::Beatmap;
use super::note::{Lane, Note, NoteId, NoteStatus};
use crate::play::judge::Tier;

/// How long before its hit time a pending note becomes visible.
pub const VISIBLE_WINDOW_MS: f64 = 2200.0;

/// How long after its hit time a note stays on screen.
pub const POST_HIT_WINDOW_MS: f64 = 120.0;

/// A note a renderer should draw, with its approach progress.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleNote {
    pub id: NoteId,
    pub status: NoteStatus,
    /// 0.0 at the top of the lane, 1.0 on the judgment line.
    pub progress: f64,
}

/// The runtime notes of one session and their judgment status.
///
/// Notes are kept in beatmap order (ascending hit time). Every note moves
/// from pending to hit or missed at most once.
#[derive(Debug, Clone)]
pub struct NoteTimeline {
    notes: Vec<Note>,
    index: HashMap<NoteId, usize>,
    /// Note indices per lane, in timeline order.
    lanes: BTreeMap<Lane, Vec<usize>>,
    pending: usize,
    /// Every note before this index is resolved.
    settled: usize,
}

impl NoteTimeline {
    /// Build the runtime timeline from a beatmap.
    ///
    /// Notes are stably sorted by authored time before ids are assigned, so
    /// a `Beatmap` built without [`load_beatmap`](super::load_beatmap) still
    /// yields an ascending timeline.
    pub fn from_beatmap(beatmap: &Beatmap) -> Self {
        let mut sources: Vec<_> = beatmap.notes.iter().collect();
        sources.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));

        let notes: Vec<Note> = sources
            .into_iter()
            .enumerate()
            .map(|(i, source)| Note {
                id: NoteId::new(&beatmap.song_id, &beatmap.difficulty_id, i),
                lane: source.lane,
                hit_time_ms: source.time_ms + beatmap.offset_ms,
                status: NoteStatus::Pending,
            })
            .collect();

        let mut index = HashMap::with_capacity(notes.len());
        let mut lanes: BTreeMap<Lane, Vec<usize>> = BTreeMap::new();
        for (i, note) in notes.iter().enumerate() {
            index.insert(note.id.clone(), i);
            lanes.entry(note.lane).or_default().push(i);
        }

        Self {
            pending: notes.len(),
            notes,
            index,
            lanes,
            settled: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.index.get(id).map(|&i| &self.notes[i])
    }

    /// Whether any note is still waiting for a judgment.
    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }

    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Lanes that hold at least one note, ascending.
    pub fn lanes(&self) -> impl Iterator<Item = Lane> {
        self.lanes.keys().copied()
    }

    /// Pending notes in `lane`, in timeline order.
    pub fn pending_in_lane(&self, lane: Lane) -> impl Iterator<Item = &Note> {
        self.pending_entries_in_lane(lane).map(|(_, note)| note)
    }

    pub(crate) fn pending_entries_in_lane(&self, lane: Lane) -> impl Iterator<Item = (usize, &Note)> {
        self.lanes
            .get(&lane)
            .into_iter()
            .flatten()
            .map(|&i| (i, &self.notes[i]))
            .filter(|(_, note)| note.is_pending())
    }

    /// Pending notes across all lanes, in timeline order.
    pub fn pending(&self) -> impl Iterator<Item = &Note> {
        self.notes[self.settled..].iter().filter(|note| note.is_pending())
    }

    /// Index of the first note that may still be pending.
    pub(crate) fn settled_prefix(&self) -> usize {
        self.settled
    }

    /// Resolve the note `id` with `tier`.
    ///
    /// Returns false, leaving the note untouched, if the id is unknown or the
    /// note was already resolved.
    pub fn mark_resolved(&mut self, id: &NoteId, tier: Tier) -> bool {
        match self.index.get(id) {
            Some(&i) => self.resolve_index(i, tier),
            None => false,
        }
    }

    pub(crate) fn resolve_index(&mut self, i: usize, tier: Tier) -> bool {
        let Some(note) = self.notes.get_mut(i) else {
            return false;
        };
        if !note.is_pending() {
            return false;
        }
        note.status = NoteStatus::resolved_by(tier);
        self.pending -= 1;
        while self.settled < self.notes.len() && !self.notes[self.settled].is_pending() {
            self.settled += 1;
        }
        true
    }

    /// Hit time of the last note.
    pub fn last_hit_time_ms(&self) -> Option<f64> {
        self.notes.last().map(|note| note.hit_time_ms)
    }

    /// Notes in `lane` that are on screen at `effective_time_ms`.
    pub fn visible_in_lane(&self, lane: Lane, effective_time_ms: f64) -> Vec<VisibleNote> {
        self.lanes
            .get(&lane)
            .into_iter()
            .flatten()
            .map(|&i| &self.notes[i])
            .filter(|note| {
                let until_hit = note.hit_time_ms - effective_time_ms;
                if until_hit < -POST_HIT_WINDOW_MS {
                    return false;
                }
                !note.is_pending() || until_hit <= VISIBLE_WINDOW_MS
            })
            .map(|note| {
                let until_hit = note.hit_time_ms - effective_time_ms;
                VisibleNote {
                    id: note.id.clone(),
                    status: note.status,
                    progress: (1.0 - until_hit / VISIBLE_WINDOW_MS).clamp(0.0, 1.0),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::beatmap::BeatmapNote;
    use crate::model::note::NoteType;
    use crate::play::judge::JudgmentEngine;
    use crate::test_utils::builders::BeatmapBuilder;

    fn timeline() -> NoteTimeline {
        let beatmap = BeatmapBuilder::new()
            .offset_ms(50.0)
            .note(1000.0, 0)
            .note(1000.0, 1)
            .note(1500.0, 0)
            .note(2000.0, 2)
            .build();
        NoteTimeline::from_beatmap(&beatmap)
    }

    #[test]
    fn applies_offset_and_ids() {
        let timeline = timeline();
        assert_eq!(timeline.len(), 4);
        let first = &timeline.notes()[0];
        assert_eq!(first.hit_time_ms, 1050.0);
        assert_eq!(first.id.as_str(), "test_song-normal-0");
        assert_eq!(timeline.notes()[3].id.as_str(), "test_song-normal-3");
        assert!(timeline.notes().iter().all(|n| n.is_pending()));
    }

    #[test]
    fn pending_in_lane_keeps_order() {
        let timeline = timeline();
        let lane0: Vec<f64> = timeline.pending_in_lane(0).map(|n| n.hit_time_ms).collect();
        assert_eq!(lane0, vec![1050.0, 1550.0]);
        assert_eq!(timeline.pending_in_lane(9).count(), 0);
        assert_eq!(timeline.lanes().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn resolution_is_single_shot() {
        let mut timeline = timeline();
        let id = timeline.notes()[0].id.clone();

        assert!(timeline.mark_resolved(&id, Tier::Great));
        assert_eq!(timeline.get(&id).unwrap().status, NoteStatus::Hit);

        // A later miss for the same note must not overwrite the hit.
        assert!(!timeline.mark_resolved(&id, Tier::Miss));
        assert_eq!(timeline.get(&id).unwrap().status, NoteStatus::Hit);
        assert_eq!(timeline.pending_count(), 3);
    }

    #[test]
    fn unknown_id_is_ignored() {
        let mut timeline = timeline();
        assert!(!timeline.mark_resolved(&NoteId::new("other", "normal", 0), Tier::Perfect));
        assert_eq!(timeline.pending_count(), 4);
    }

    #[test]
    fn has_pending_tracks_resolution() {
        let mut timeline = timeline();
        let ids: Vec<NoteId> = timeline.notes().iter().map(|n| n.id.clone()).collect();
        for id in &ids {
            assert!(timeline.has_pending());
            timeline.mark_resolved(id, Tier::Miss);
        }
        assert!(!timeline.has_pending());
        assert_eq!(timeline.pending().count(), 0);
    }

    #[test]
    fn settled_prefix_skips_resolved_head() {
        let mut timeline = timeline();
        let ids: Vec<NoteId> = timeline.notes().iter().map(|n| n.id.clone()).collect();
        timeline.mark_resolved(&ids[1], Tier::Perfect);
        assert_eq!(timeline.settled_prefix(), 0);
        timeline.mark_resolved(&ids[0], Tier::Perfect);
        assert_eq!(timeline.settled_prefix(), 2);
    }

    #[test]
    fn unsorted_beatmap_is_sorted_by_hit_time() {
        let mut beatmap = BeatmapBuilder::new().note(1000.0, 1).build();
        beatmap.notes.insert(
            0,
            BeatmapNote {
                time_ms: 2000.0,
                lane: 0,
                note_type: NoteType::Tap,
                duration_ms: None,
            },
        );

        let mut timeline = NoteTimeline::from_beatmap(&beatmap);
        let times: Vec<f64> = timeline.notes().iter().map(|n| n.hit_time_ms).collect();
        assert_eq!(times, vec![1000.0, 2000.0]);
        assert_eq!(timeline.notes()[0].id.as_str(), "test_song-normal-0");
        assert_eq!(timeline.notes()[0].lane, 1);

        let missed = JudgmentEngine::default().sweep_misses(&mut timeline, 1500.0);
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].lane, 1);
        assert_eq!(timeline.pending_count(), 1);
        assert_eq!(timeline.settled_prefix(), 1);
    }

    #[test]
    fn visible_window() {
        let mut timeline = timeline();
        // At 0ms only notes within 2200ms are visible: 1050 and 1550 in lane 0.
        let visible = timeline.visible_in_lane(0, 0.0);
        assert_eq!(visible.len(), 2);
        assert!((visible[0].progress - (1.0 - 1050.0 / 2200.0)).abs() < 1e-9);

        // Far ahead of time nothing in lane 2 is visible yet.
        assert!(timeline.visible_in_lane(2, -1000.0).is_empty());

        // A resolved note stays on screen until 120ms past its hit time.
        let id = timeline.notes()[0].id.clone();
        timeline.mark_resolved(&id, Tier::Perfect);
        let visible = timeline.visible_in_lane(0, 1150.0);
        assert_eq!(visible[0].status, NoteStatus::Hit);
        assert_eq!(visible[0].progress, 1.0);
        assert_eq!(timeline.visible_in_lane(0, 1171.0).len(), 1);
    }
}
