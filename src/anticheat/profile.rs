use std::collections::{HashMap, VecDeque};

/// Ring buffer depth per player.
const HISTORY_LIMIT: usize = 1000;
/// Packet cadence samples kept for the regularity read.
const INTERVAL_SAMPLE_LIMIT: usize = 120;
/// Declared action durations kept for the variance read.
const REACTION_SAMPLE_LIMIT: usize = 60;
/// Per-action frequency is measured over this sliding window, ms.
const FREQUENCY_WINDOW_MS: u64 = 1000;
/// Shadow adjustment wears off after a day of packet time.
const SHADOW_ADJUST_LIFETIME_MS: u64 = 24 * 60 * 60 * 1000;
/// Geometric trust decay applied on every validated packet.
const TRUST_DECAY: f32 = 0.01;

/// Enforcement levels, strictly ordered. A profile only ever climbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PenaltyLevel {
    #[default]
    None,
    Monitor,
    Restrict,
    ShadowAdjust,
    Ban,
}

impl PenaltyLevel {
    pub fn for_risk(risk: f32) -> Self {
        if risk > 0.8 {
            PenaltyLevel::Ban
        } else if risk > 0.6 {
            PenaltyLevel::ShadowAdjust
        } else if risk > 0.4 {
            PenaltyLevel::Restrict
        } else if risk > 0.2 {
            PenaltyLevel::Monitor
        } else {
            PenaltyLevel::None
        }
    }
}

/// One validated packet, retained for pattern analysis.
#[derive(Debug, Clone, Copy)]
pub struct PacketRecord {
    pub timestamp_ms: u64,
    pub position: [f32; 3],
    pub risk: f32,
}

/// Rolling per-player state across packets: last observed kinematics, a
/// bounded history, a trust score, the enforcement level, and the
/// behavioral reads (input cadence, reaction-time spread, per-action
/// frequency).
#[derive(Debug)]
pub struct BehavioralProfile {
    history: VecDeque<PacketRecord>,
    trust: f32,
    penalty: PenaltyLevel,
    shadow_adjust_until_ms: Option<u64>,
    intervals_ms: VecDeque<u64>,
    reaction_times_ms: VecDeque<u32>,
    /// Recent timestamps per action tag, pruned to the frequency window.
    action_times_ms: HashMap<u8, VecDeque<u64>>,
    pub last_timestamp_ms: Option<u64>,
    pub last_position: Option<[f32; 3]>,
    pub last_sequence: Option<u64>,
}

impl Default for BehavioralProfile {
    fn default() -> Self {
        BehavioralProfile {
            history: VecDeque::new(),
            trust: 1.0,
            penalty: PenaltyLevel::None,
            shadow_adjust_until_ms: None,
            intervals_ms: VecDeque::new(),
            reaction_times_ms: VecDeque::new(),
            action_times_ms: HashMap::new(),
            last_timestamp_ms: None,
            last_position: None,
            last_sequence: None,
        }
    }
}

impl BehavioralProfile {
    pub fn trust(&self) -> f32 {
        self.trust
    }

    pub fn penalty(&self) -> PenaltyLevel {
        self.penalty
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn record(&mut self, record: PacketRecord) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    pub fn note_interval(&mut self, interval_ms: u64) {
        if self.intervals_ms.len() == INTERVAL_SAMPLE_LIMIT {
            self.intervals_ms.pop_front();
        }
        self.intervals_ms.push_back(interval_ms);
    }

    /// Packet cadence regularity in [0, 1]: 1.0 is a metronome, human
    /// input drifts lower. Zero until enough samples arrive.
    pub fn input_regularity(&self) -> f32 {
        if self.intervals_ms.len() < 4 {
            return 0.0;
        }

        let n = self.intervals_ms.len() as f32;
        let mean = self.intervals_ms.iter().sum::<u64>() as f32 / n;
        if mean <= 0.0 {
            return 1.0;
        }
        let variance = self
            .intervals_ms
            .iter()
            .map(|&i| {
                let d = i as f32 - mean;
                d * d
            })
            .sum::<f32>()
            / n;

        (1.0 - variance.sqrt() / mean).clamp(0.0, 1.0)
    }

    pub fn note_reaction(&mut self, duration_ms: u32) {
        if self.reaction_times_ms.len() == REACTION_SAMPLE_LIMIT {
            self.reaction_times_ms.pop_front();
        }
        self.reaction_times_ms.push_back(duration_ms);
    }

    /// Spread of the declared action durations, ms². A scripted client
    /// with fixed timings sits at zero.
    pub fn reaction_time_variance(&self) -> f32 {
        if self.reaction_times_ms.len() < 2 {
            return 0.0;
        }

        let n = self.reaction_times_ms.len() as f32;
        let mean = self.reaction_times_ms.iter().sum::<u32>() as f32 / n;
        self.reaction_times_ms
            .iter()
            .map(|&d| {
                let delta = d as f32 - mean;
                delta * delta
            })
            .sum::<f32>()
            / n
    }

    pub fn note_action(&mut self, tag: u8, timestamp_ms: u64) {
        let times = self.action_times_ms.entry(tag).or_default();
        times.push_back(timestamp_ms);
        while times
            .front()
            .is_some_and(|t| timestamp_ms.saturating_sub(*t) > FREQUENCY_WINDOW_MS)
        {
            times.pop_front();
        }
    }

    /// How many actions of this kind landed inside the sliding window.
    pub fn action_rate(&self, tag: u8) -> usize {
        self.action_times_ms.get(&tag).map_or(0, VecDeque::len)
    }

    /// Trust decays 1% on every update and takes an extra cut in
    /// proportion to the packet's risk; it never climbs back.
    pub fn update_trust(&mut self, risk: f32) {
        self.trust *= 1.0 - TRUST_DECAY;
        self.trust -= risk * 0.1;
        self.trust = self.trust.clamp(0.0, 1.0);
    }

    /// Raise the enforcement level if this risk warrants it. Levels
    /// never de-escalate within a match.
    pub fn escalate(&mut self, risk: f32, now_ms: u64) -> PenaltyLevel {
        let proposed = PenaltyLevel::for_risk(risk);
        if proposed > self.penalty {
            self.penalty = proposed;
            if proposed == PenaltyLevel::ShadowAdjust {
                self.shadow_adjust_until_ms = Some(now_ms + SHADOW_ADJUST_LIFETIME_MS);
            }
        }
        self.penalty
    }

    /// Whether the player's outputs are currently being silently damped.
    pub fn is_shadow_adjusted(&self, now_ms: u64) -> bool {
        self.penalty == PenaltyLevel::ShadowAdjust
            && self.shadow_adjust_until_ms.is_some_and(|until| now_ms < until)
    }

    pub fn mean_recent_risk(&self, samples: usize) -> f32 {
        let taken: Vec<f32> = self
            .history
            .iter()
            .rev()
            .take(samples)
            .map(|r| r.risk)
            .collect();
        if taken.is_empty() {
            return 0.0;
        }
        taken.iter().sum::<f32>() / taken.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_thresholds_map_to_levels() {
        assert_eq!(PenaltyLevel::for_risk(0.1), PenaltyLevel::None);
        assert_eq!(PenaltyLevel::for_risk(0.3), PenaltyLevel::Monitor);
        assert_eq!(PenaltyLevel::for_risk(0.5), PenaltyLevel::Restrict);
        assert_eq!(PenaltyLevel::for_risk(0.7), PenaltyLevel::ShadowAdjust);
        assert_eq!(PenaltyLevel::for_risk(0.9), PenaltyLevel::Ban);
    }

    #[test]
    fn penalties_never_deescalate() {
        let mut profile = BehavioralProfile::default();
        assert_eq!(profile.escalate(0.7, 0), PenaltyLevel::ShadowAdjust);
        // A run of clean packets does not walk the level back.
        assert_eq!(profile.escalate(0.0, 1000), PenaltyLevel::ShadowAdjust);
    }

    #[test]
    fn shadow_adjust_expires_on_packet_time() {
        let mut profile = BehavioralProfile::default();
        profile.escalate(0.7, 1_000);

        assert!(profile.is_shadow_adjusted(2_000));
        assert!(!profile.is_shadow_adjusted(1_000 + 24 * 60 * 60 * 1000 + 1));
    }

    #[test]
    fn history_is_ring_bounded() {
        let mut profile = BehavioralProfile::default();
        for i in 0..1500 {
            profile.record(PacketRecord {
                timestamp_ms: i,
                position: [0.0; 3],
                risk: 0.0,
            });
        }

        assert_eq!(profile.history_len(), 1000);
    }

    #[test]
    fn metronomic_cadence_reads_as_regular() {
        let mut scripted = BehavioralProfile::default();
        for _ in 0..20 {
            scripted.note_interval(100);
        }
        assert!(scripted.input_regularity() > 0.95);

        let mut human = BehavioralProfile::default();
        for i in 0..20u64 {
            human.note_interval(80 + (i * 37) % 60);
        }
        assert!(human.input_regularity() < scripted.input_regularity());
    }

    #[test]
    fn reaction_time_variance_tracks_spread() {
        let mut steady = BehavioralProfile::default();
        for _ in 0..10 {
            steady.note_reaction(200);
        }
        assert_eq!(steady.reaction_time_variance(), 0.0);

        let mut jittery = BehavioralProfile::default();
        for duration in [150u32, 250, 180, 320, 210, 140, 260, 190, 300, 170] {
            jittery.note_reaction(duration);
        }
        assert!(jittery.reaction_time_variance() > 0.0);
    }

    #[test]
    fn action_rate_counts_only_the_sliding_window() {
        let mut profile = BehavioralProfile::default();
        profile.note_action(1, 1000);
        profile.note_action(1, 1400);
        profile.note_action(1, 1900);
        assert_eq!(profile.action_rate(1), 3);

        // The next shot pushes the stale ones out of the window.
        profile.note_action(1, 2500);
        assert_eq!(profile.action_rate(1), 2);
        assert_eq!(profile.action_rate(2), 0);
    }

    #[test]
    fn trust_decays_even_on_a_clean_update() {
        let mut profile = BehavioralProfile::default();
        profile.update_trust(0.0);
        assert!((profile.trust() - 0.99).abs() < 1e-6);

        for _ in 0..100 {
            profile.update_trust(0.0);
        }
        assert!(profile.trust() < 0.99);
    }

    #[test]
    fn risk_cuts_trust_on_top_of_the_decay() {
        let mut clean = BehavioralProfile::default();
        let mut risky = BehavioralProfile::default();
        clean.update_trust(0.0);
        risky.update_trust(0.9);

        assert!(risky.trust() < clean.trust());
        assert!((clean.trust() - risky.trust() - 0.09).abs() < 1e-3);
    }
}
