//! Local input history and the redundant input packet built from it.
//!
//! Each packet repeats up to `INPUTS_PER_PACKET` samples walking back from
//! the current sequence, so one lost datagram is covered by the next.

use net_core::udp::{InputPacket, InputSample, WireSample, INPUTS_PER_PACKET};

pub const HISTORY_SIZE: usize = 1024;

/// Ring of the most recent samples, slot `sequence % HISTORY_SIZE`.
pub struct InputHistory {
    slots: Vec<Option<InputSample>>,
}

impl Default for InputHistory {
    fn default() -> Self {
        Self { slots: vec![None; HISTORY_SIZE] }
    }
}

impl InputHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: InputSample) {
        let i = (sample.sequence % HISTORY_SIZE as u64) as usize;
        self.slots[i] = Some(sample);
    }

    /// The sample stored for `sequence`, if its slot has not been overwritten.
    pub fn get(&self, sequence: u64) -> Option<&InputSample> {
        let i = (sequence % HISTORY_SIZE as u64) as usize;
        self.slots[i].as_ref().filter(|s| s.sequence == sequence)
    }
}

/// Build the packet for `sequence`: the newest sample first, then its
/// predecessors while each slot still holds the expected sequence.
///
/// Returns `None` when `sequence` itself is not in the history.
pub fn write_input_packet(history: &InputHistory, session: u64, sequence: u64) -> Option<InputPacket> {
    let newest = history.get(sequence)?;
    let mut samples = Vec::with_capacity(INPUTS_PER_PACKET);
    samples.push(WireSample { dt: newest.dt, input: newest.input });
    for back in 1..INPUTS_PER_PACKET as u64 {
        let Some(seq) = sequence.checked_sub(back) else { break };
        let Some(s) = history.get(seq) else { break };
        samples.push(WireSample { dt: s.dt, input: s.input });
    }
    Some(InputPacket { session, sequence, t: newest.t, samples })
}

#[cfg(test)]
mod tests {
    use super::*;
    use net_core::udp::INPUT_BYTES;

    fn sample(sequence: u64, t: u64, dt: u64) -> InputSample {
        InputSample { sequence, t, dt, input: [sequence as u8; INPUT_BYTES] }
    }

    fn filled(from: u64, to: u64) -> InputHistory {
        let mut h = InputHistory::new();
        for seq in from..=to {
            h.record(sample(seq, seq * 10, 10));
        }
        h
    }

    #[test]
    fn full_window_walks_back() {
        let h = filled(0, 50);
        let p = write_input_packet(&h, 3, 50).unwrap();
        assert_eq!(p.samples.len(), INPUTS_PER_PACKET);
        assert_eq!(p.t, 500);
        assert_eq!(p.samples[0].input[0], 50);
        assert_eq!(p.samples[9].input[0], 41);
        let expanded = p.expand();
        let want: Vec<InputSample> = (41..=50).map(|s| sample(s, s * 10, 10)).collect();
        assert_eq!(expanded, want);
    }

    #[test]
    fn window_stops_at_start_of_stream() {
        let h = filled(0, 3);
        let p = write_input_packet(&h, 1, 3).unwrap();
        assert_eq!(p.samples.len(), 4);
    }

    #[test]
    fn window_stops_at_gap() {
        let mut h = filled(90, 100);
        // 95 was overwritten by a sample one lap later
        h.record(sample(95 + HISTORY_SIZE as u64, 0, 10));
        h.record(sample(101, 1_010, 10));
        let p = write_input_packet(&h, 1, 101).unwrap();
        let seqs: Vec<u64> = p.expand().iter().map(|s| s.sequence).collect();
        assert_eq!(seqs, vec![96, 97, 98, 99, 100, 101]);
    }

    #[test]
    fn missing_current_sequence_has_no_packet() {
        let h = filled(0, 3);
        assert!(write_input_packet(&h, 1, 4).is_none());
    }
}
