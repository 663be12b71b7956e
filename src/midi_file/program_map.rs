use super::event::EventKind;
use super::note::Microseconds;
use super::track::Track;

pub const CHANNELS: usize = 16;

#[derive(Debug, Clone)]
struct Bucket {
    time: Microseconds,
    programs: [u8; CHANNELS],
}

/// Which program every channel is using at any point of the song.
///
/// Used to bring an output device back in sync after a seek, since the
/// program changes that were skipped over are never delivered.
#[derive(Debug, Clone, Default)]
pub struct ProgramMap {
    buckets: Vec<Bucket>,
}

impl ProgramMap {
    pub fn new(tracks: &[Track]) -> Self {
        let mut changes: Vec<(Microseconds, u8, u8)> = tracks
            .iter()
            .flat_map(|track| track.events().iter().zip(track.event_usecs()))
            .filter_map(|(event, &time)| match event.kind {
                EventKind::ProgramChange { channel, program } => Some((time, channel, program)),
                _ => None,
            })
            .collect();
        changes.sort_by_key(|&(time, _, _)| time);

        let mut programs = [0u8; CHANNELS];
        let mut buckets: Vec<Bucket> = Vec::new();
        for (time, channel, program) in changes {
            programs[usize::from(channel) % CHANNELS] = program;
            match buckets.last_mut() {
                Some(bucket) if bucket.time == time => bucket.programs = programs,
                _ => buckets.push(Bucket { time, programs }),
            }
        }

        Self { buckets }
    }

    /// Programs in effect at `time`; channels never changed report 0.
    pub fn programs_at(&self, time: Microseconds) -> [u8; CHANNELS] {
        let idx = self.buckets.partition_point(|b| b.time <= time);
        match idx {
            0 => [0; CHANNELS],
            _ => self.buckets[idx - 1].programs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi_file::event::MidiEvent;
    use crate::midi_file::tempo::TempoMap;
    use std::collections::BTreeMap;

    fn program(delta: u32, channel: u8, program: u8) -> MidiEvent {
        MidiEvent::new(delta, EventKind::ProgramChange { channel, program })
    }

    #[test]
    fn test_programs_follow_time() {
        let tempo = TempoMap::new(&BTreeMap::new(), 480);
        let tracks = vec![
            Track::new(0, vec![program(0, 0, 5), program(480, 0, 7)], &tempo),
            Track::new(1, vec![program(480, 3, 40)], &tempo),
        ];
        let map = ProgramMap::new(&tracks);

        assert_eq!(map.programs_at(-1), [0; CHANNELS]);
        assert_eq!(map.programs_at(0)[0], 5);
        assert_eq!(map.programs_at(499_999)[0], 5);

        let later = map.programs_at(500_000);
        assert_eq!(later[0], 7);
        assert_eq!(later[3], 40);
    }
}
