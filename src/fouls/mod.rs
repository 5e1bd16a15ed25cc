pub mod discipline;
pub mod referee;

pub use discipline::DisciplinaryRecord;
pub use referee::{Referee, RefereePersonality, VISIBILITY_THRESHOLD};

use crate::context::{PenaltyArea, Team};
use crate::physics::{CollisionData, MatchField};
use log::debug;
use nalgebra::Vector3;
use rand::Rng;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f32::consts::PI;

/// Ball-first contacts below this closing speed are legal challenges.
const BALL_FIRST_EXEMPTION_SPEED: f32 = 6.0;
/// How long a promising advantage is allowed to develop.
const ADVANTAGE_WINDOW: f64 = 3.0;
/// A serious foul this close to the defended goal denies a clear chance.
const DENIAL_RADIUS: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FoulSeverity {
    Light,
    Medium,
    Serious,
    Violent,
}

impl FoulSeverity {
    /// Base card probability before referee temperament and history.
    pub fn card_base(self) -> f32 {
        match self {
            FoulSeverity::Light => 0.10,
            FoulSeverity::Medium => 0.40,
            FoulSeverity::Serious => 0.80,
            FoulSeverity::Violent => 1.00,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoulType {
    Handball,
    Trip,
    DangerousSlide,
    AggressiveTackle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Card {
    Yellow,
    Red,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FoulData {
    pub offender: u32,
    pub victim: u32,
    pub offending_team: Team,
    pub position: [f32; 3],
    pub severity: FoulSeverity,
    pub foul_type: FoulType,
}

/// Where play restarts after a whistle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FoulRestart {
    FreeKick { position: Vector3<f32>, team: Team },
    Penalty { team: Team },
}

/// What the referee decided about one incident.
#[derive(Debug, Clone)]
pub enum FoulRuling {
    Whistle {
        foul: FoulData,
        card: Option<Card>,
        restart: FoulRestart,
    },
    AdvantagePlayed {
        fouled_team: Team,
    },
}

/// Grade a contact by closing speed and approach angle. Both thresholds
/// of a tier must be met; winning the ball first excuses everything
/// below the reckless-speed bar.
pub fn classify_severity(contact: &CollisionData) -> Option<FoulSeverity> {
    if contact.ball_contacted_first && contact.relative_velocity < BALL_FIRST_EXEMPTION_SPEED {
        return None;
    }

    let speed = contact.relative_velocity;
    let angle = contact.contact_angle;

    if speed >= 8.5 && angle >= 0.4 * PI {
        Some(FoulSeverity::Violent)
    } else if speed >= 6.0 && angle >= PI / 3.0 {
        Some(FoulSeverity::Serious)
    } else if speed >= 4.0 && angle >= PI / 4.0 {
        Some(FoulSeverity::Medium)
    } else if speed >= 2.0 && angle >= PI / 8.0 {
        Some(FoulSeverity::Light)
    } else {
        None
    }
}

fn classify_type(contact: &CollisionData, severity: FoulSeverity) -> FoulType {
    if contact.arm_contact {
        FoulType::Handball
    } else if contact.contact_angle > 1.2 {
        FoulType::DangerousSlide
    } else if severity >= FoulSeverity::Serious {
        FoulType::AggressiveTackle
    } else {
        FoulType::Trip
    }
}

struct PendingAdvantage {
    foul: FoulData,
    fouled_team: Team,
    deadline: f64,
}

/// Referee judgment wired between the collision detector and the set
/// piece system. At most one advantage develops at a time.
pub struct FoulSystem {
    referee: Referee,
    records: HashMap<u32, DisciplinaryRecord>,
    pending: Option<PendingAdvantage>,
}

impl FoulSystem {
    pub fn new(personality: RefereePersonality, rng: &mut impl Rng) -> Self {
        FoulSystem {
            referee: Referee::new(personality.jittered(rng)),
            records: HashMap::new(),
            pending: None,
        }
    }

    pub fn referee(&self) -> &Referee {
        &self.referee
    }

    pub fn record(&self, player_id: u32) -> Option<&DisciplinaryRecord> {
        self.records.get(&player_id)
    }

    pub fn is_sent_off(&self, player_id: u32) -> bool {
        self.records
            .get(&player_id)
            .is_some_and(|r| r.is_sent_off())
    }

    /// Judge this tick's high-energy contacts. Returns rulings for
    /// incidents whistled immediately; advantage situations stay pending.
    pub fn process_contacts(
        &mut self,
        contacts: &[CollisionData],
        field: &MatchField,
        clock: f64,
        rng: &mut impl Rng,
    ) -> Vec<FoulRuling> {
        let mut rulings = Vec::new();

        for contact in contacts {
            let Some(severity) = classify_severity(contact) else {
                continue;
            };

            // While an advantage develops, only a worse offense gets
            // through; anything lesser is swallowed by the window.
            if let Some(pending) = &self.pending {
                if severity <= pending.foul.severity {
                    continue;
                }
            }

            let visibility = self.referee.visibility(contact.contact_point, &field.players);
            if visibility < VISIBILITY_THRESHOLD {
                debug!(
                    "unseen foul by {} (visibility {:.2})",
                    contact.offender, visibility
                );
                continue;
            }

            let Some(offender) = field.player(contact.offender) else {
                continue;
            };
            let offending_team = offender.team;
            let fouled_team = offending_team.opposite();

            let foul = FoulData {
                offender: contact.offender,
                victim: contact.victim,
                offending_team,
                position: contact.contact_point.into(),
                severity,
                foul_type: classify_type(contact, severity),
            };

            self.records
                .entry(contact.offender)
                .or_default()
                .record_foul(clock, severity);

            if self.pending.take().is_some() {
                // The graver foul is whistled at once; play comes back
                // for it and the advantage dies.
                let card = self.decide_card(&foul, clock, rng);
                rulings.push(Self::whistle(foul, card));
                continue;
            }

            let advantage_viable = severity <= FoulSeverity::Medium
                && Self::retains_possession(field, fouled_team)
                && rng.random::<f32>() < self.referee.personality.advantage_tendency;

            if advantage_viable {
                debug!("advantage developing for {:?}", fouled_team);
                self.pending = Some(PendingAdvantage {
                    foul,
                    fouled_team,
                    deadline: clock + ADVANTAGE_WINDOW,
                });
                continue;
            }

            let card = self.decide_card(&foul, clock, rng);
            rulings.push(Self::whistle(foul, card));
        }

        rulings
    }

    /// Advance the referee and any developing advantage. Called every
    /// physics step.
    pub fn tick(
        &mut self,
        field: &MatchField,
        clock: f64,
        dt: f32,
        rng: &mut impl Rng,
    ) -> Option<FoulRuling> {
        self.referee.follow_play(field.ball.position, dt);

        let pending = self.pending.as_ref()?;
        let retained = Self::retains_possession(field, pending.fouled_team);

        if retained && clock < pending.deadline {
            return None;
        }

        let pending = self.pending.take()?;
        if retained {
            debug!("advantage paid off for {:?}", pending.fouled_team);
            return Some(FoulRuling::AdvantagePlayed {
                fouled_team: pending.fouled_team,
            });
        }

        // Possession broke down: call the original foul back.
        let card = self.decide_card(&pending.foul, clock, rng);
        Some(Self::whistle(pending.foul, card))
    }

    /// Drop a developing advantage at a period boundary; cards and foul
    /// history carry for the whole match.
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Full wipe for a fresh match: the advantage and every
    /// disciplinary record.
    pub fn reset(&mut self) {
        self.pending = None;
        self.records.clear();
    }

    fn retains_possession(field: &MatchField, team: Team) -> bool {
        match field.ball.owner {
            Some(owner) => field.player(owner).is_some_and(|p| p.team == team),
            None => field.ball.last_touch_team == Some(team),
        }
    }

    fn whistle(foul: FoulData, card: Option<Card>) -> FoulRuling {
        let position = Vector3::new(foul.position[0], foul.position[1], 0.0);
        let fouled_team = foul.offending_team.opposite();

        let restart = if PenaltyArea::for_team(foul.offending_team).contains(&position) {
            FoulRestart::Penalty { team: fouled_team }
        } else {
            FoulRestart::FreeKick {
                position,
                team: fouled_team,
            }
        };

        FoulRuling::Whistle {
            foul,
            card,
            restart,
        }
    }

    fn decide_card(&mut self, foul: &FoulData, clock: f64, rng: &mut impl Rng) -> Option<Card> {
        let record = self.records.entry(foul.offender).or_default();

        // Automatic reds are never left to probability.
        if foul.severity == FoulSeverity::Violent {
            record.record_card(Card::Red);
            return Some(Card::Red);
        }

        let position = Vector3::new(foul.position[0], foul.position[1], 0.0);
        let defended = foul.offending_team.defended_goal();
        if foul.severity == FoulSeverity::Serious && (position - defended).norm() < DENIAL_RADIUS {
            record.record_card(Card::Red);
            return Some(Card::Red);
        }

        let probability = foul.severity.card_base()
            * self.referee.personality.card_tendency
            * record.frequency_boost(clock);

        if rng.random::<f32>() >= probability {
            return None;
        }

        // A second yellow is always a red, never a judgment call.
        let card = if record.yellows() >= 1 {
            Card::Red
        } else {
            Card::Yellow
        };
        record.record_card(card);
        Some(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{MatchPlayer, PlayerRole, PlayerStats};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn contact(speed: f32, angle: f32) -> CollisionData {
        CollisionData {
            offender: 9,
            victim: 1,
            contact_point: Vector3::new(50.0, 34.0, 0.0),
            relative_velocity: speed,
            contact_angle: angle,
            ball_contacted_first: false,
            arm_contact: false,
        }
    }

    fn player_at(id: u32, team: Team, x: f32, y: f32) -> MatchPlayer {
        MatchPlayer::new(
            id,
            team,
            PlayerRole::Outfield,
            Vector3::new(x, y, 0.0),
            PlayerStats::default(),
        )
    }

    #[test]
    fn nine_meters_per_second_at_fifty_degrees_is_medium() {
        // Fast but not from behind: speed clears the serious bar, the
        // angle does not.
        let severity = classify_severity(&contact(9.0, 50.0_f32.to_radians()));
        assert_eq!(severity, Some(FoulSeverity::Medium));
    }

    #[test]
    fn clean_ball_first_challenge_is_legal() {
        let mut data = contact(4.0, PI / 3.0);
        data.ball_contacted_first = true;

        assert_eq!(classify_severity(&data), None);
    }

    #[test]
    fn reckless_ball_first_challenge_is_still_a_foul() {
        let mut data = contact(8.0, PI / 3.0);
        data.ball_contacted_first = true;

        assert_eq!(classify_severity(&data), Some(FoulSeverity::Serious));
    }

    #[test]
    fn violent_contact_needs_both_thresholds() {
        assert_eq!(
            classify_severity(&contact(10.0, 0.45 * PI)),
            Some(FoulSeverity::Violent)
        );
        // Same speed head-on grades lower.
        assert_eq!(
            classify_severity(&contact(10.0, PI / 4.0)),
            Some(FoulSeverity::Medium)
        );
    }

    #[test]
    fn gentle_shoulder_contact_is_no_foul() {
        assert_eq!(classify_severity(&contact(1.5, PI / 2.0)), None);
    }

    #[test]
    fn handball_overrides_other_types() {
        let mut data = contact(5.0, PI / 3.0);
        data.arm_contact = true;

        assert_eq!(
            classify_type(&data, FoulSeverity::Medium),
            FoulType::Handball
        );
    }

    #[test]
    fn violent_foul_is_a_straight_red() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut system = FoulSystem::new(RefereePersonality::lenient(), &mut rng);

        let foul = FoulData {
            offender: 9,
            victim: 1,
            offending_team: Team::Away,
            position: [50.0, 34.0, 0.0],
            severity: FoulSeverity::Violent,
            foul_type: FoulType::AggressiveTackle,
        };

        assert_eq!(system.decide_card(&foul, 100.0, &mut rng), Some(Card::Red));
        assert!(system.is_sent_off(9));
    }

    #[test]
    fn serious_foul_near_goal_denies_a_chance() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut system = FoulSystem::new(RefereePersonality::lenient(), &mut rng);

        // Away defends x = 105; foul 10 m out.
        let foul = FoulData {
            offender: 9,
            victim: 1,
            offending_team: Team::Away,
            position: [95.0, 34.0, 0.0],
            severity: FoulSeverity::Serious,
            foul_type: FoulType::AggressiveTackle,
        };

        assert_eq!(system.decide_card(&foul, 100.0, &mut rng), Some(Card::Red));
    }

    #[test]
    fn second_yellow_is_deterministically_red() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut system = FoulSystem::new(RefereePersonality::strict(), &mut rng);
        system
            .records
            .entry(9)
            .or_default()
            .record_card(Card::Yellow);

        // Serious foul under a strict referee with history: probability
        // saturates above 1, so the roll cannot miss.
        let foul = FoulData {
            offender: 9,
            victim: 1,
            offending_team: Team::Away,
            position: [50.0, 34.0, 0.0],
            severity: FoulSeverity::Serious,
            foul_type: FoulType::AggressiveTackle,
        };
        system.records.entry(9).or_default().record_foul(98.0, FoulSeverity::Serious);
        system.records.entry(9).or_default().record_foul(99.0, FoulSeverity::Serious);

        assert_eq!(system.decide_card(&foul, 100.0, &mut rng), Some(Card::Red));
        assert!(system.is_sent_off(9));
    }

    #[test]
    fn foul_in_own_box_awards_a_penalty() {
        let foul = FoulData {
            offender: 9,
            victim: 1,
            offending_team: Team::Home,
            position: [8.0, 34.0, 0.0],
            severity: FoulSeverity::Medium,
            foul_type: FoulType::Trip,
        };

        match FoulSystem::whistle(foul, None) {
            FoulRuling::Whistle { restart, .. } => {
                assert_eq!(restart, FoulRestart::Penalty { team: Team::Away });
            }
            _ => panic!("expected a whistle"),
        }
    }

    #[test]
    fn advantage_resolves_when_possession_holds() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut system = FoulSystem::new(RefereePersonality::lenient(), &mut rng);

        let mut field = MatchField::new(vec![
            player_at(1, Team::Home, 50.0, 34.0),
            player_at(9, Team::Away, 50.5, 34.0),
        ]);
        field.ball.owner = Some(1);

        system.pending = Some(PendingAdvantage {
            foul: FoulData {
                offender: 9,
                victim: 1,
                offending_team: Team::Away,
                position: [50.0, 34.0, 0.0],
                severity: FoulSeverity::Light,
                foul_type: FoulType::Trip,
            },
            fouled_team: Team::Home,
            deadline: 10.0,
        });

        // Window still open: nothing to rule.
        assert!(system.tick(&field, 9.0, 1.0 / 60.0, &mut rng).is_none());

        // Window elapsed with possession kept: advantage stands.
        match system.tick(&field, 10.5, 1.0 / 60.0, &mut rng) {
            Some(FoulRuling::AdvantagePlayed { fouled_team }) => {
                assert_eq!(fouled_team, Team::Home);
            }
            other => panic!("expected advantage, got {other:?}"),
        }
    }

    #[test]
    fn worse_foul_interrupts_a_developing_advantage() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut system = FoulSystem::new(RefereePersonality::lenient(), &mut rng);

        let field = MatchField::new(vec![
            player_at(1, Team::Home, 50.0, 34.0),
            player_at(9, Team::Away, 50.5, 34.0),
        ]);

        system.pending = Some(PendingAdvantage {
            foul: FoulData {
                offender: 9,
                victim: 1,
                offending_team: Team::Away,
                position: [50.0, 34.0, 0.0],
                severity: FoulSeverity::Light,
                foul_type: FoulType::Trip,
            },
            fouled_team: Team::Home,
            deadline: 10.0,
        });

        // Another light contact inside the window is swallowed.
        let light = contact(2.5, PI / 6.0);
        assert!(system.process_contacts(&[light], &field, 7.0, &mut rng).is_empty());
        assert!(system.pending.is_some());

        // A violent lunge is not: immediate whistle, advantage over.
        let violent = contact(10.0, 0.45 * PI);
        let rulings = system.process_contacts(&[violent], &field, 8.0, &mut rng);

        assert_eq!(rulings.len(), 1);
        match &rulings[0] {
            FoulRuling::Whistle { foul, card, .. } => {
                assert_eq!(foul.severity, FoulSeverity::Violent);
                assert_eq!(*card, Some(Card::Red));
            }
            other => panic!("expected whistle, got {other:?}"),
        }
        assert!(system.pending.is_none());
    }

    #[test]
    fn period_boundary_keeps_disciplinary_records() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut system = FoulSystem::new(RefereePersonality::balanced(), &mut rng);
        system.records.entry(9).or_default().record_card(Card::Yellow);
        system.pending = Some(PendingAdvantage {
            foul: FoulData {
                offender: 9,
                victim: 1,
                offending_team: Team::Away,
                position: [50.0, 34.0, 0.0],
                severity: FoulSeverity::Light,
                foul_type: FoulType::Trip,
            },
            fouled_team: Team::Home,
            deadline: 10.0,
        });

        system.clear_pending();
        assert!(system.pending.is_none());
        assert_eq!(system.record(9).map(|r| r.yellows()), Some(1));

        system.reset();
        assert!(system.record(9).is_none());
    }

    #[test]
    fn lost_advantage_brings_play_back() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut system = FoulSystem::new(RefereePersonality::lenient(), &mut rng);

        let mut field = MatchField::new(vec![
            player_at(1, Team::Home, 50.0, 34.0),
            player_at(9, Team::Away, 50.5, 34.0),
        ]);
        // Possession swung to the offending team right after the foul.
        field.ball.owner = Some(9);

        system.pending = Some(PendingAdvantage {
            foul: FoulData {
                offender: 9,
                victim: 1,
                offending_team: Team::Away,
                position: [50.0, 34.0, 0.0],
                severity: FoulSeverity::Light,
                foul_type: FoulType::Trip,
            },
            fouled_team: Team::Home,
            deadline: 10.0,
        });

        match system.tick(&field, 8.0, 1.0 / 60.0, &mut rng) {
            Some(FoulRuling::Whistle { foul, .. }) => {
                assert_eq!(foul.offender, 9);
            }
            other => panic!("expected whistle, got {other:?}"),
        }
    }
}
