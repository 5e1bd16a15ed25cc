pub mod profile;

pub use profile::{BehavioralProfile, PacketRecord, PenaltyLevel};

use crate::constants::MAX_PLAYER_SPEED;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// No human input source produces packets faster than this.
const MIN_PACKET_INTERVAL_MS: f64 = 8.33;
/// Displacement tolerance over the speed limit before a move reads as a
/// teleport rather than lag.
const TELEPORT_TOLERANCE: f32 = 1.5;
/// A claimed tackle from farther than this is physically impossible.
const MAX_TACKLE_RANGE: f32 = 5.0;
/// Declared action durations must sit inside this envelope, ms.
const MAX_ACTION_DURATION_MS: u32 = 2000;
/// More shots than this inside a second is scripted input.
const MAX_SHOTS_PER_SECOND: usize = 3;
/// Rate ceiling per second for the other ball actions.
const MAX_ACTIONS_PER_SECOND: usize = 5;

const WEIGHT_MOVEMENT: f32 = 0.30;
const WEIGHT_TELEPORT: f32 = 0.25;
const WEIGHT_ACTION: f32 = 0.20;
const WEIGHT_INTEGRITY: f32 = 0.15;
const WEIGHT_ECONOMY: f32 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PacketAction {
    Move,
    Shot,
    Pass,
    Tackle { target: [f32; 2] },
    Idle,
}

impl PacketAction {
    fn tag(&self) -> u8 {
        match self {
            PacketAction::Move => 0,
            PacketAction::Shot => 1,
            PacketAction::Pass => 2,
            PacketAction::Tackle { .. } => 3,
            PacketAction::Idle => 4,
        }
    }
}

/// One client input frame as received by the server side of the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPacket {
    pub player_id: u32,
    pub sequence: u64,
    pub timestamp_ms: u64,
    /// Raw device input times inside this frame, ms, ascending.
    pub input_timestamps_ms: Vec<u64>,
    pub position: [f32; 3],
    pub action: PacketAction,
    pub action_duration_ms: u32,
    pub checksum: [u8; 32],
}

impl MatchPacket {
    /// Keyed digest over every gameplay-relevant field. The key never
    /// travels with the packet.
    pub fn compute_checksum(&self, key: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(key);
        hasher.update(self.player_id.to_le_bytes());
        hasher.update(self.sequence.to_le_bytes());
        hasher.update(self.timestamp_ms.to_le_bytes());
        hasher.update((self.input_timestamps_ms.len() as u32).to_le_bytes());
        for input in &self.input_timestamps_ms {
            hasher.update(input.to_le_bytes());
        }
        for coordinate in self.position {
            hasher.update(coordinate.to_le_bytes());
        }
        hasher.update([self.action.tag()]);
        if let PacketAction::Tackle { target } = self.action {
            hasher.update(target[0].to_le_bytes());
            hasher.update(target[1].to_le_bytes());
        }
        hasher.update(self.action_duration_ms.to_le_bytes());
        hasher.finalize().into()
    }

    pub fn sign(&mut self, key: &[u8]) {
        self.checksum = self.compute_checksum(key);
    }
}

/// Per-packet verdict with the individual detector outputs. The final
/// risk is the fixed weighted sum of the five of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyDetection {
    pub movement_score: f32,
    pub teleport_score: f32,
    pub action_score: f32,
    pub integrity_score: f32,
    pub economy_score: f32,
    pub risk: f32,
    pub penalty: PenaltyLevel,
}

type EconomyHook = Box<dyn Fn(&MatchPacket) -> f32 + Send + Sync>;

/// Server-side packet validator. Stateless rules plus a behavioral
/// profile per player; every packet gets a risk score and may raise the
/// player's enforcement level.
pub struct PacketValidator {
    key: Vec<u8>,
    profiles: HashMap<u32, BehavioralProfile>,
    economy_hook: Option<EconomyHook>,
}

impl PacketValidator {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        PacketValidator {
            key: key.into(),
            profiles: HashMap::new(),
            economy_hook: None,
        }
    }

    /// Install the economy-side detector. Without one, that component
    /// scores zero and its weight still counts in the denominator.
    pub fn with_economy_hook(mut self, hook: EconomyHook) -> Self {
        self.economy_hook = Some(hook);
        self
    }

    pub fn profile(&self, player_id: u32) -> Option<&BehavioralProfile> {
        self.profiles.get(&player_id)
    }

    pub fn is_banned(&self, player_id: u32) -> bool {
        self.profiles
            .get(&player_id)
            .is_some_and(|p| p.penalty() == PenaltyLevel::Ban)
    }

    pub fn is_shadow_adjusted(&self, player_id: u32, now_ms: u64) -> bool {
        self.profiles
            .get(&player_id)
            .is_some_and(|p| p.is_shadow_adjusted(now_ms))
    }

    pub fn validate(&mut self, packet: &MatchPacket) -> AnomalyDetection {
        let integrity_score = self.integrity_score(packet);
        let economy_score = self
            .economy_hook
            .as_ref()
            .map(|hook| hook(packet).clamp(0.0, 1.0))
            .unwrap_or(0.0);

        let profile = self.profiles.entry(packet.player_id).or_default();

        let (movement_score, teleport_score) = kinematic_scores(profile, packet);
        let action_score = action_score(profile, packet);

        let risk = WEIGHT_MOVEMENT * movement_score
            + WEIGHT_TELEPORT * teleport_score
            + WEIGHT_ACTION * action_score
            + WEIGHT_INTEGRITY * integrity_score
            + WEIGHT_ECONOMY * economy_score;

        profile.record(PacketRecord {
            timestamp_ms: packet.timestamp_ms,
            position: packet.position,
            risk,
        });
        profile.update_trust(risk);
        let penalty = profile.escalate(risk, packet.timestamp_ms);

        if let Some(last) = profile.last_timestamp_ms {
            profile.note_interval(packet.timestamp_ms.saturating_sub(last));
        }
        if packet.action != PacketAction::Idle {
            profile.note_reaction(packet.action_duration_ms);
        }
        profile.note_action(packet.action.tag(), packet.timestamp_ms);

        profile.last_timestamp_ms = Some(packet.timestamp_ms);
        profile.last_position = Some(packet.position);
        profile.last_sequence = Some(packet.sequence);

        if risk > 0.4 {
            warn!(
                "player {} risk {:.2} (move {:.2} tp {:.2} act {:.2} int {:.2} eco {:.2}) -> {:?}",
                packet.player_id,
                risk,
                movement_score,
                teleport_score,
                action_score,
                integrity_score,
                economy_score,
                penalty
            );
        } else {
            debug!("player {} packet clean, risk {:.2}", packet.player_id, risk);
        }

        AnomalyDetection {
            movement_score,
            teleport_score,
            action_score,
            integrity_score,
            economy_score,
            risk,
            penalty,
        }
    }

    /// Checksum and ordering checks. A wrong digest is conclusive on its
    /// own; a rewound clock or replayed sequence is almost as bad.
    fn integrity_score(&self, packet: &MatchPacket) -> f32 {
        if packet.checksum != packet.compute_checksum(&self.key) {
            return 1.0;
        }

        if let Some(profile) = self.profiles.get(&packet.player_id) {
            let rewound = profile
                .last_timestamp_ms
                .is_some_and(|last| packet.timestamp_ms <= last);
            let replayed = profile
                .last_sequence
                .is_some_and(|last| packet.sequence <= last);
            if rewound || replayed {
                return 0.8;
            }
        }

        0.0
    }
}

/// Speed-hack and teleport components from the displacement since the
/// previous packet.
fn kinematic_scores(profile: &BehavioralProfile, packet: &MatchPacket) -> (f32, f32) {
    // Per-input deltas below the hardware floor are scripted no matter
    // what the packet cadence looks like.
    let scripted_inputs = packet
        .input_timestamps_ms
        .windows(2)
        .any(|pair| (pair[1].saturating_sub(pair[0]) as f64) < MIN_PACKET_INTERVAL_MS);
    if scripted_inputs {
        return (1.0, 0.0);
    }

    let (Some(last_position), Some(last_timestamp)) =
        (profile.last_position, profile.last_timestamp_ms)
    else {
        return (0.0, 0.0);
    };

    let interval_ms = packet.timestamp_ms.saturating_sub(last_timestamp) as f64;
    if interval_ms < MIN_PACKET_INTERVAL_MS {
        // Faster than any hardware produces input.
        return (1.0, 0.0);
    }

    let dx = packet.position[0] - last_position[0];
    let dy = packet.position[1] - last_position[1];
    let displacement = (dx * dx + dy * dy).sqrt();
    let dt = (interval_ms / 1000.0) as f32;
    let speed = displacement / dt;

    let movement = if speed > MAX_PLAYER_SPEED {
        ((speed - MAX_PLAYER_SPEED) / MAX_PLAYER_SPEED).min(1.0)
    } else {
        0.0
    };

    let allowed = MAX_PLAYER_SPEED * dt * TELEPORT_TOLERANCE;
    let teleport = if displacement > allowed { 1.0 } else { 0.0 };

    (movement, teleport)
}

/// Physically impossible claims in the action payload.
fn action_score(profile: &BehavioralProfile, packet: &MatchPacket) -> f32 {
    if packet.action_duration_ms > MAX_ACTION_DURATION_MS {
        return 1.0;
    }

    if let PacketAction::Tackle { target } = packet.action {
        let dx = target[0] - packet.position[0];
        let dy = target[1] - packet.position[1];
        if (dx * dx + dy * dy).sqrt() > MAX_TACKLE_RANGE {
            return 1.0;
        }
    }

    let rate = profile.action_rate(packet.action.tag());
    let spammed = match packet.action {
        PacketAction::Shot => rate >= MAX_SHOTS_PER_SECOND,
        PacketAction::Pass | PacketAction::Tackle { .. } => rate >= MAX_ACTIONS_PER_SECOND,
        PacketAction::Move | PacketAction::Idle => false,
    };
    if spammed {
        return 0.8;
    }

    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"match-session-key";

    fn packet(player_id: u32, sequence: u64, timestamp_ms: u64, x: f32, y: f32) -> MatchPacket {
        let mut packet = MatchPacket {
            player_id,
            sequence,
            timestamp_ms,
            input_timestamps_ms: Vec::new(),
            position: [x, y, 0.0],
            action: PacketAction::Move,
            action_duration_ms: 100,
            checksum: [0; 32],
        };
        packet.sign(KEY);
        packet
    }

    #[test]
    fn clean_packet_scores_near_zero() {
        let mut validator = PacketValidator::new(KEY);
        validator.validate(&packet(1, 1, 1000, 50.0, 34.0));
        let verdict = validator.validate(&packet(1, 2, 1100, 50.5, 34.0));

        assert!(verdict.risk < 0.05);
        assert_eq!(verdict.penalty, PenaltyLevel::None);
    }

    #[test]
    fn risk_is_the_exact_weighted_sum() {
        let detection = AnomalyDetection {
            movement_score: 1.0,
            teleport_score: 1.0,
            action_score: 1.0,
            integrity_score: 1.0,
            economy_score: 1.0,
            ..AnomalyDetection::default()
        };
        let risk = 0.30 * detection.movement_score
            + 0.25 * detection.teleport_score
            + 0.20 * detection.action_score
            + 0.15 * detection.integrity_score
            + 0.10 * detection.economy_score;
        assert!((risk - 1.0).abs() < 1e-6);

        // The validator reproduces the same arithmetic end to end: a
        // tampered teleporting packet with an impossible tackle.
        let mut validator = PacketValidator::new(KEY);
        validator.validate(&packet(1, 1, 1000, 10.0, 10.0));

        let mut bad = MatchPacket {
            player_id: 1,
            sequence: 2,
            timestamp_ms: 1100,
            input_timestamps_ms: Vec::new(),
            position: [90.0, 60.0, 0.0],
            action: PacketAction::Tackle { target: [50.0, 10.0] },
            action_duration_ms: 100,
            checksum: [0; 32],
        };
        bad.sign(b"wrong-key");

        let verdict = validator.validate(&bad);
        let expected = 0.30 * verdict.movement_score
            + 0.25 * verdict.teleport_score
            + 0.20 * verdict.action_score
            + 0.15 * verdict.integrity_score
            + 0.10 * verdict.economy_score;
        assert!((verdict.risk - expected).abs() < 1e-6);
        assert_eq!(verdict.integrity_score, 1.0);
        assert_eq!(verdict.teleport_score, 1.0);
    }

    #[test]
    fn impossible_speed_is_flagged() {
        let mut validator = PacketValidator::new(KEY);
        validator.validate(&packet(1, 1, 1000, 10.0, 34.0));
        // 20 m in 100 ms: 200 m/s.
        let verdict = validator.validate(&packet(1, 2, 1100, 30.0, 34.0));

        assert!(verdict.movement_score > 0.9);
        assert_eq!(verdict.teleport_score, 1.0);
    }

    #[test]
    fn inhuman_input_rate_is_flagged() {
        let mut validator = PacketValidator::new(KEY);
        validator.validate(&packet(1, 1, 1000, 10.0, 34.0));
        let verdict = validator.validate(&packet(1, 2, 1004, 10.1, 34.0));

        assert_eq!(verdict.movement_score, 1.0);
    }

    #[test]
    fn sub_frame_input_deltas_are_flagged() {
        let mut validator = PacketValidator::new(KEY);
        validator.validate(&packet(1, 1, 1000, 50.0, 34.0));

        // Three inputs five milliseconds apart: no hardware does that.
        let mut scripted = MatchPacket {
            player_id: 1,
            sequence: 2,
            timestamp_ms: 1100,
            input_timestamps_ms: vec![1010, 1015, 1020],
            position: [50.2, 34.0, 0.0],
            action: PacketAction::Move,
            action_duration_ms: 100,
            checksum: [0; 32],
        };
        scripted.sign(KEY);

        let verdict = validator.validate(&scripted);
        assert_eq!(verdict.movement_score, 1.0);
    }

    #[test]
    fn tackle_spam_reads_as_scripted_input() {
        let mut validator = PacketValidator::new(KEY);

        let mut last = AnomalyDetection::default();
        for i in 0..8u64 {
            let mut p = MatchPacket {
                player_id: 1,
                sequence: 1 + i,
                timestamp_ms: 1000 + i * 100,
                input_timestamps_ms: Vec::new(),
                position: [50.0, 34.0, 0.0],
                action: PacketAction::Tackle { target: [51.0, 34.0] },
                action_duration_ms: 150,
                checksum: [0; 32],
            };
            p.sign(KEY);
            last = validator.validate(&p);
        }

        assert_eq!(last.action_score, 0.8);
    }

    #[test]
    fn profile_accumulates_behavioral_reads() {
        let mut validator = PacketValidator::new(KEY);
        for i in 0..10u64 {
            validator.validate(&packet(1, 1 + i, 1000 + i * 100, 50.0, 34.0));
        }

        let profile = validator.profile(1).unwrap();
        // A perfectly even 100 ms cadence reads as machine-regular, and
        // the identical declared durations leave no variance.
        assert!(profile.input_regularity() > 0.95);
        assert_eq!(profile.reaction_time_variance(), 0.0);
        assert!(profile.action_rate(PacketAction::Move.tag()) > 0);
    }

    #[test]
    fn tampered_checksum_maxes_integrity() {
        let mut validator = PacketValidator::new(KEY);
        let mut bad = packet(1, 1, 1000, 50.0, 34.0);
        bad.position[0] = 60.0; // edited after signing

        let verdict = validator.validate(&bad);
        assert_eq!(verdict.integrity_score, 1.0);
    }

    #[test]
    fn rewound_timestamp_is_suspicious() {
        let mut validator = PacketValidator::new(KEY);
        validator.validate(&packet(1, 5, 2000, 50.0, 34.0));
        let verdict = validator.validate(&packet(1, 6, 1500, 50.2, 34.0));

        assert!(verdict.integrity_score > 0.5);
    }

    #[test]
    fn far_tackle_claim_is_impossible() {
        let mut validator = PacketValidator::new(KEY);
        let mut p = MatchPacket {
            player_id: 1,
            sequence: 1,
            timestamp_ms: 1000,
            input_timestamps_ms: Vec::new(),
            position: [50.0, 34.0, 0.0],
            action: PacketAction::Tackle { target: [60.0, 34.0] },
            action_duration_ms: 200,
            checksum: [0; 32],
        };
        p.sign(KEY);

        let verdict = validator.validate(&p);
        assert_eq!(verdict.action_score, 1.0);
    }

    #[test]
    fn sustained_cheating_escalates_to_ban_and_stays() {
        let mut validator = PacketValidator::new(KEY);
        validator.validate(&packet(1, 1, 1000, 0.0, 0.0));

        for i in 0..10u64 {
            let mut bad = MatchPacket {
                player_id: 1,
                sequence: 2 + i,
                timestamp_ms: 1100 + i * 100,
                input_timestamps_ms: Vec::new(),
                position: [100.0 - i as f32 * 90.0 % 100.0, 60.0, 0.0],
                action: PacketAction::Tackle { target: [0.0, 0.0] },
                action_duration_ms: 5000,
                checksum: [0; 32],
            };
            bad.sign(b"wrong-key");
            validator.validate(&bad);
        }
        assert!(validator.is_banned(1));

        // Clean traffic afterwards does not lift the ban.
        let verdict = validator.validate(&packet(1, 100, 60_000, 50.0, 34.0));
        assert_eq!(verdict.penalty, PenaltyLevel::Ban);
    }

    #[test]
    fn economy_hook_contributes_its_weight() {
        let mut validator =
            PacketValidator::new(KEY).with_economy_hook(Box::new(|_| 1.0));
        validator.validate(&packet(1, 1, 1000, 50.0, 34.0));
        let verdict = validator.validate(&packet(1, 2, 1100, 50.2, 34.0));

        assert_eq!(verdict.economy_score, 1.0);
        assert!((verdict.risk - 0.10).abs() < 1e-6);
    }
}
