use crate::ai::{AiAction, AiIntent, GameStateView, TacticalAi};
use crate::anticheat::{AnomalyDetection, MatchPacket, PacketValidator};
use crate::constants::{
    MAX_FRAME_TIME, MAX_STEPS_PER_ADVANCE, PLAYER_RADIUS, SIMULATION_TIMESTEP,
    VALIDATOR_INTERVAL_TICKS,
};
use crate::context::{
    ConfigError, GameConfig, MatchSnapshot, PlayerSnapshot, Score, Team,
};
use crate::events::{EventCollection, MatchEvent, RestartKind};
use crate::fouls::{FoulRestart, FoulRuling, FoulSystem, RefereePersonality};
use crate::goalkeeper::{GoalkeeperSystem, goal_line_crossing};
use crate::learning::{AdaptiveLearning, ShotCorner};
use crate::physics::{
    BoundaryOutcome, MatchField, MatchPlayer, MovementIntent, actions, collision, validator,
};
use crate::setpiece::{SetPieceKind, SetPieceSystem};
use crate::time::{ControlSwitcher, MatchClock, MatchPhase, StoppageCause};
use log::info;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// How far in front of the feet a dribbled ball is carried.
const DRIBBLE_OFFSET: f32 = 0.6;
/// A loose ball inside this radius can be brought under control.
const POSSESSION_RADIUS: f32 = PLAYER_RADIUS + 0.5;
/// Above this approach speed the ball skips off the boot instead.
const POSSESSION_MAX_CLOSING: f32 = 6.0;
/// Ticks between idle-opponent sweeps in the learning store.
const LEARNING_SWEEP_TICKS: u64 = 60 * 60;

/// Ball actions a human player can request for the controlled player.
#[derive(Debug, Clone, Copy)]
pub enum PlayerAction {
    Shoot { direction: Vector3<f32>, power: f32 },
    Pass { direction: Vector3<f32>, power: f32 },
    Tackle { direction: Vector3<f32> },
}

/// The whole match in one value. All randomness flows through a single
/// seeded generator, so two engines built from the same config and fed
/// the same inputs replay identically.
pub struct MatchEngine {
    config: GameConfig,
    field: MatchField,
    score: Score,
    clock: MatchClock,
    ai: TacticalAi,
    keepers: GoalkeeperSystem,
    fouls: FoulSystem,
    setpieces: SetPieceSystem,
    switcher: ControlSwitcher,
    learning: AdaptiveLearning,
    packets: PacketValidator,
    rng: StdRng,
    accumulator: f32,
    tick_count: u64,
    kickoff_positions: Vec<(u32, Vector3<f32>)>,
}

impl MatchEngine {
    pub fn new(config: GameConfig, players: Vec<MatchPlayer>) -> Result<Self, ConfigError> {
        config.validate()?;

        let has_home = players.iter().any(|p| p.team == Team::Home);
        let has_away = players.iter().any(|p| p.team == Team::Away);
        if !has_home || !has_away {
            return Err(ConfigError::EmptyRoster);
        }

        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut ai = TacticalAi::new(config.difficulty);
        for player in &players {
            ai.register_player(player, &mut rng);
        }

        let kickoff_positions = players.iter().map(|p| (p.id, p.position)).collect();
        let fouls = FoulSystem::new(RefereePersonality::balanced(), &mut rng);
        let clock = MatchClock::new(&config);
        let packets = PacketValidator::new(config.seed.to_le_bytes().to_vec());

        Ok(MatchEngine {
            config,
            field: MatchField::new(players),
            score: Score::default(),
            clock,
            ai,
            keepers: GoalkeeperSystem::new(),
            fouls,
            setpieces: SetPieceSystem::new(),
            switcher: ControlSwitcher::new(Team::Home, true),
            learning: AdaptiveLearning::new(),
            packets,
            rng,
            accumulator: 0.0,
            tick_count: 0,
            kickoff_positions,
        })
    }

    pub fn field(&self) -> &MatchField {
        &self.field
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn clock(&self) -> &MatchClock {
        &self.clock
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn learning(&self) -> &AdaptiveLearning {
        &self.learning
    }

    /// Advance by one rendered frame. Physics runs at the fixed timestep
    /// inside an accumulator; oversized frames are capped, the step count
    /// per call is bounded, and any surplus carries into the next frame.
    pub fn advance(&mut self, frame_dt: f32) -> EventCollection {
        let mut events = EventCollection::new();
        if self.clock.phase() == MatchPhase::Finished {
            return events;
        }

        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_TIME);

        let mut steps = 0;
        while self.accumulator >= SIMULATION_TIMESTEP && steps < MAX_STEPS_PER_ADVANCE {
            self.step(&mut events);
            self.accumulator -= SIMULATION_TIMESTEP;
            steps += 1;
        }

        if self.clock.is_running() && !self.setpieces.is_active() {
            let view = GameStateView {
                home_margin: self.score.margin_for(Team::Home),
                elapsed_fraction: (self.clock.total_elapsed()
                    / self.config.match_duration as f64)
                    .clamp(0.0, 1.0) as f32,
                carrier_threat: self
                    .field
                    .ball
                    .owner
                    .map(|id| self.learning.success_tendency(id))
                    .unwrap_or(0.5),
            };
            let intents = self.ai.tick(
                &self.field,
                view,
                self.clock.total_elapsed(),
                &self.learning,
                &mut self.rng,
            );
            self.apply_ai_intents(intents);
        }

        if let Some(player_id) = self.switcher.tick(&mut self.field, frame_dt) {
            events.add(MatchEvent::ControlSwitched { player_id });
        }

        events
    }

    /// One fixed simulation step.
    fn step(&mut self, events: &mut EventCollection) {
        let dt = SIMULATION_TIMESTEP;

        if !self.clock.is_running() {
            // Interlude or shootout: only the clock moves.
            if let Some(phase) = self.clock.tick(dt as f64, &self.score) {
                self.on_phase_change(phase, events);
            }
            return;
        }

        self.tick_count += 1;
        let now = self.clock.total_elapsed();

        self.setpieces.tick(&mut self.field, dt, &mut self.rng, events);
        if !self.setpieces.is_active() {
            self.clock.resolve_stoppages();
        }

        for player in &mut self.field.players {
            player.step(dt);
        }
        self.step_ball(dt);

        collision::resolve_ball_contacts(&mut self.field.ball, &self.field.players);
        let contacts = collision::resolve_player_contacts(&mut self.field.players, &self.field.ball);

        let rulings = self
            .fouls
            .process_contacts(&contacts, &self.field, now, &mut self.rng);
        for ruling in rulings {
            self.handle_ruling(ruling, events);
        }
        if let Some(ruling) = self.fouls.tick(&self.field, now, dt, &mut self.rng) {
            self.handle_ruling(ruling, events);
        }

        let dive_bias = self.current_dive_bias();
        self.keepers
            .tick(&mut self.field, dive_bias, dt, &mut self.rng);

        if !self.setpieces.is_active() {
            self.try_claim_possession();
            if let Some(outcome) = self.field.ball.check_bounds() {
                self.handle_boundary(outcome, events);
            }
        }

        if let Some(phase) = self.clock.tick(dt as f64, &self.score) {
            self.on_phase_change(phase, events);
        }

        if self.tick_count.is_multiple_of(VALIDATOR_INTERVAL_TICKS) {
            validator::validate(&mut self.field);
        }
        if self.tick_count.is_multiple_of(LEARNING_SWEEP_TICKS) {
            self.learning.evict_idle(now);
        }
    }

    /// A dribbled ball rides in front of the owner; a free ball flies.
    fn step_ball(&mut self, dt: f32) {
        if let Some(owner_id) = self.field.ball.owner {
            if let Some(owner) = self.field.player(owner_id) {
                let (heading, position, velocity) =
                    (owner.heading, owner.position, owner.velocity);
                let carry = Vector3::new(
                    heading.cos() * DRIBBLE_OFFSET,
                    heading.sin() * DRIBBLE_OFFSET,
                    0.0,
                );
                self.field.ball.position = position + carry;
                self.field.ball.velocity = velocity;
                return;
            }
            self.field.ball.owner = None;
        }

        self.field.ball.step(dt);
    }

    fn try_claim_possession(&mut self) {
        let ball = &self.field.ball;
        if ball.owner.is_some() || ball.position.z > 0.8 {
            return;
        }
        let ball_position = ball.position;
        let ball_velocity = ball.velocity;

        let claimant = self
            .field
            .players
            .iter()
            .find(|p| {
                (p.position - ball_position).norm() < POSSESSION_RADIUS
                    && (p.velocity - ball_velocity).norm() < POSSESSION_MAX_CLOSING
            })
            .map(|p| (p.id, p.team));

        if let Some((id, team)) = claimant {
            let ball = &mut self.field.ball;
            ball.owner = Some(id);
            ball.velocity = Vector3::zeros();
            ball.spin = Vector3::zeros();
            ball.touch(id, team);
        }
    }

    fn handle_ruling(&mut self, ruling: FoulRuling, events: &mut EventCollection) {
        match ruling {
            FoulRuling::AdvantagePlayed { fouled_team } => {
                events.add(MatchEvent::AdvantagePlayed { fouled_team });
            }
            FoulRuling::Whistle {
                foul,
                card,
                restart,
            } => {
                events.add(MatchEvent::Foul { foul, card });
                self.clock.begin_stoppage(StoppageCause::Foul);

                if self.fouls.is_sent_off(foul.offender) {
                    self.remove_player(foul.offender);
                }

                match restart {
                    FoulRestart::FreeKick { position, team } => {
                        self.setpieces.initiate(
                            SetPieceKind::FreeKick,
                            team,
                            position,
                            &mut self.field,
                            events,
                        );
                    }
                    FoulRestart::Penalty { team } => {
                        self.setpieces.initiate(
                            SetPieceKind::Penalty,
                            team,
                            Vector3::zeros(),
                            &mut self.field,
                            events,
                        );
                    }
                }
            }
        }
    }

    fn handle_boundary(&mut self, outcome: BoundaryOutcome, events: &mut EventCollection) {
        match outcome {
            BoundaryOutcome::Goal { conceding } => {
                let scoring = conceding.opposite();
                let scorer = self.field.ball.last_touched_by;
                self.score.increment(scoring);

                if let Some(id) = scorer {
                    if self.field.ball.last_touch_team == Some(scoring) {
                        let corner = ShotCorner::from_target_y(self.field.ball.position.y);
                        let now = self.clock.total_elapsed();
                        self.learning.observe_shot(id, corner, now);
                        self.learning.observe_outcome(id, true, now);
                    }
                }

                events.add(MatchEvent::Goal {
                    team: scoring,
                    scorer,
                });
                self.clock.begin_stoppage(StoppageCause::Goal);
                self.setpieces.reset();
                self.field.reset_positions(&self.kickoff_positions);
            }
            BoundaryOutcome::ThrowIn { position } => {
                let awarded = self
                    .field
                    .ball
                    .last_touch_team
                    .map(|t| t.opposite())
                    .unwrap_or(Team::Home);
                events.add(MatchEvent::OutOfBounds {
                    restart: RestartKind::ThrowIn,
                    position: position.into(),
                    awarded_to: awarded,
                });
                self.clock.begin_stoppage(StoppageCause::BallOut);
                self.setpieces
                    .initiate(SetPieceKind::ThrowIn, awarded, position, &mut self.field, events);
            }
            BoundaryOutcome::Corner { position } => {
                // The conceding side defends the goal line that was
                // crossed; the attack takes the corner.
                let conceding = if position.x < crate::constants::FIELD_LENGTH / 2.0 {
                    Team::Home
                } else {
                    Team::Away
                };
                let awarded = conceding.opposite();
                events.add(MatchEvent::OutOfBounds {
                    restart: RestartKind::Corner,
                    position: position.into(),
                    awarded_to: awarded,
                });
                self.clock.begin_stoppage(StoppageCause::BallOut);
                self.setpieces
                    .initiate(SetPieceKind::Corner, awarded, position, &mut self.field, events);
            }
            BoundaryOutcome::GoalKick { defending } => {
                events.add(MatchEvent::OutOfBounds {
                    restart: RestartKind::GoalKick,
                    position: self.field.ball.position.into(),
                    awarded_to: defending,
                });
                self.clock.begin_stoppage(StoppageCause::BallOut);
                self.setpieces.initiate(
                    SetPieceKind::GoalKick,
                    defending,
                    Vector3::zeros(),
                    &mut self.field,
                    events,
                );
            }
        }
    }

    fn on_phase_change(&mut self, phase: MatchPhase, events: &mut EventCollection) {
        events.add(MatchEvent::PhaseChanged { phase });

        match phase {
            MatchPhase::SecondHalf | MatchPhase::ExtraTime => {
                self.setpieces.reset();
                // Cards carry across periods; only the advantage dies.
                self.fouls.clear_pending();
                self.keepers.reset();
                self.field.reset_positions(&self.kickoff_positions);
            }
            MatchPhase::PenaltyShootout => {
                self.setpieces.reset();
                self.field.reset_positions(&self.kickoff_positions);
                info!("regulation level at {:?}, going to penalties", self.score);
            }
            MatchPhase::Finished => {
                info!("full time: {:?}", self.score);
            }
            MatchPhase::FirstHalf => {}
        }
    }

    fn apply_ai_intents(&mut self, intents: Vec<AiIntent>) {
        for intent in intents {
            let Some(player) = self.field.player(intent.player_id) else {
                continue;
            };
            let has_ball = self.field.ball.owner == Some(intent.player_id);
            let player_id = intent.player_id;

            match intent.action {
                AiAction::Shoot | AiAction::Clear if has_ball => {
                    let player = player.clone();
                    actions::shoot(
                        &player,
                        &mut self.field.ball,
                        intent.direction,
                        intent.power,
                        &mut self.rng,
                    );
                    self.observe_shot_habit(player_id, player.team);
                }
                AiAction::Pass if has_ball => {
                    let player = player.clone();
                    actions::pass(
                        &player,
                        &mut self.field.ball,
                        intent.direction,
                        intent.power,
                        &mut self.rng,
                    );
                    let angle = intent.direction.y.atan2(intent.direction.x);
                    self.learning
                        .observe_pass(player_id, angle, self.clock.total_elapsed());
                }
                AiAction::Tackle => {
                    self.apply_movement(player_id, intent);
                    self.try_tackle(player_id);
                }
                AiAction::HoldBall => {
                    if let Some(p) = self.field.player_mut(player_id) {
                        p.intent = MovementIntent::default();
                    }
                }
                _ => self.apply_movement(player_id, intent),
            }
        }
    }

    fn apply_movement(&mut self, player_id: u32, intent: AiIntent) {
        if let Some(player) = self.field.player_mut(player_id) {
            player.intent = MovementIntent {
                direction: intent.direction,
                power: intent.power.clamp(0.0, 1.0),
                sprinting: intent.power > 0.65,
            };
        }
    }

    fn try_tackle(&mut self, player_id: u32) {
        let Some(player) = self.field.player(player_id) else {
            return;
        };
        let reach = (self.field.ball.position - player.position).norm();
        if reach > PLAYER_RADIUS + 1.0 {
            return;
        }
        // Only a ball held by an opponent can be poked loose.
        let Some(owner_id) = self.field.ball.owner else {
            return;
        };
        let opponent_held = self
            .field
            .player(owner_id)
            .is_some_and(|o| o.team != player.team);
        if !opponent_held {
            return;
        }

        let player = player.clone();
        let direction = player.team.attacked_goal() - player.position;
        self.field.ball.owner = None;
        actions::tackle(&player, &mut self.field.ball, direction, &mut self.rng);
        self.learning
            .observe_outcome(owner_id, false, self.clock.total_elapsed());
    }

    /// After a shot leaves the boot, record which corner it targets so
    /// keepers can anticipate repeat offenders.
    fn observe_shot_habit(&mut self, shooter: u32, team: Team) {
        if let Some(crossing) = goal_line_crossing(&self.field.ball, team.opposite()) {
            let corner = ShotCorner::from_target_y(crossing.position.y);
            self.learning
                .observe_shot(shooter, corner, self.clock.total_elapsed());
        }
    }

    fn current_dive_bias(&self) -> f32 {
        match self.field.ball.last_touched_by {
            Some(id) => self.learning.dive_bias(id),
            None => 0.0,
        }
    }

    fn remove_player(&mut self, player_id: u32) {
        if self.field.ball.owner == Some(player_id) {
            self.field.ball.owner = None;
        }
        self.field.players.retain(|p| p.id != player_id);
        self.kickoff_positions.retain(|(id, _)| *id != player_id);
        info!("player {player_id} leaves the pitch");
    }

    /// Movement input for the controlled player. Banned players are
    /// ignored outright; shadow-adjusted ones are silently damped.
    pub fn player_input(&mut self, player_id: u32, mut intent: MovementIntent) {
        if self.packets.is_banned(player_id) {
            return;
        }
        let now_ms = (self.clock.total_elapsed() * 1000.0) as u64;
        if self.packets.is_shadow_adjusted(player_id, now_ms) {
            intent.power *= 0.85;
        }

        if let Some(player) = self.field.player_mut(player_id) {
            if player.is_controlled {
                player.intent = intent;
            }
        }
    }

    /// Ball action for the controlled player. During a set piece this is
    /// routed to the restart taker instead of free play.
    pub fn player_action(&mut self, player_id: u32, action: PlayerAction) -> bool {
        if self.packets.is_banned(player_id) {
            return false;
        }

        if self.setpieces.is_active() {
            let (direction, power) = match action {
                PlayerAction::Shoot { direction, power } => (direction, power),
                PlayerAction::Pass { direction, power } => (direction, power),
                PlayerAction::Tackle { direction } => (direction, 0.6),
            };
            return self
                .setpieces
                .execute(player_id, direction, power, &mut self.field, &mut self.rng);
        }

        let Some(player) = self.field.player(player_id) else {
            return false;
        };
        if !player.is_controlled {
            return false;
        }
        let has_ball = self.field.ball.owner == Some(player_id);
        let player = player.clone();

        match action {
            PlayerAction::Shoot { direction, power } if has_ball => {
                actions::shoot(&player, &mut self.field.ball, direction, power, &mut self.rng);
                self.observe_shot_habit(player_id, player.team);
                true
            }
            PlayerAction::Pass { direction, power } if has_ball => {
                actions::pass(&player, &mut self.field.ball, direction, power, &mut self.rng);
                let angle = direction.y.atan2(direction.x);
                self.learning
                    .observe_pass(player_id, angle, self.clock.total_elapsed());
                true
            }
            PlayerAction::Tackle { .. } => {
                self.try_tackle(player_id);
                true
            }
            _ => false,
        }
    }

    /// Manual control switch request from the player.
    pub fn request_control_switch(&mut self) -> Option<u32> {
        self.switcher.request_switch(&mut self.field)
    }

    /// Validate one client packet against the anti-cheat rules.
    pub fn ingest_packet(&mut self, packet: &MatchPacket) -> AnomalyDetection {
        self.packets.validate(packet)
    }

    pub fn is_player_banned(&self, player_id: u32) -> bool {
        self.packets.is_banned(player_id)
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            ball_position: self.field.ball.position.into(),
            ball_velocity: self.field.ball.velocity.into(),
            players: self
                .field
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    id: p.id,
                    team: p.team,
                    position: p.position.into(),
                    velocity: p.velocity.into(),
                    stamina: p.stamina,
                    is_controlled: p.is_controlled,
                })
                .collect(),
            match_time: self.clock.total_elapsed(),
            stoppage_display: self.clock.display(),
            score: self.score.clone(),
            phase: self.clock.phase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Difficulty;
    use crate::physics::{PlayerRole, PlayerStats};

    fn roster() -> Vec<MatchPlayer> {
        let mut players = Vec::new();
        players.push(MatchPlayer::new(
            1,
            Team::Home,
            PlayerRole::Goalkeeper,
            Vector3::new(2.0, 34.0, 0.0),
            PlayerStats::default(),
        ));
        for i in 0..4u32 {
            players.push(MatchPlayer::new(
                2 + i,
                Team::Home,
                PlayerRole::Outfield,
                Vector3::new(25.0 + i as f32 * 8.0, 20.0 + i as f32 * 8.0, 0.0),
                PlayerStats::default(),
            ));
        }
        players.push(MatchPlayer::new(
            11,
            Team::Away,
            PlayerRole::Goalkeeper,
            Vector3::new(103.0, 34.0, 0.0),
            PlayerStats::default(),
        ));
        for i in 0..4u32 {
            players.push(MatchPlayer::new(
                12 + i,
                Team::Away,
                PlayerRole::Outfield,
                Vector3::new(80.0 - i as f32 * 8.0, 20.0 + i as f32 * 8.0, 0.0),
                PlayerStats::default(),
            ));
        }
        players
    }

    fn engine() -> MatchEngine {
        let config = GameConfig {
            match_duration: 600.0,
            difficulty: Difficulty::Normal,
            extra_time_enabled: false,
            penalties_enabled: false,
            seed: 42,
        };
        MatchEngine::new(config, roster()).unwrap()
    }

    #[test]
    fn one_sided_roster_is_rejected() {
        let players: Vec<MatchPlayer> = roster()
            .into_iter()
            .filter(|p| p.team == Team::Home)
            .collect();
        assert!(matches!(
            MatchEngine::new(GameConfig::default(), players),
            Err(ConfigError::EmptyRoster)
        ));
    }

    #[test]
    fn accumulator_steps_exactly_per_frame_budget() {
        let mut e = engine();

        // 8 ms is less than one timestep: no physics step.
        e.advance(0.008);
        assert_eq!(e.tick_count(), 0);

        // Another 40 ms brings the accumulator to 48 ms: two steps.
        e.advance(0.040);
        assert_eq!(e.tick_count(), 2);

        // A 300 ms spike is capped at 250 ms and bounded to 5 steps.
        let before = e.tick_count();
        e.advance(0.300);
        assert_eq!(e.tick_count() - before, MAX_STEPS_PER_ADVANCE as u64);
    }

    #[test]
    fn surplus_is_carried_into_the_next_frame() {
        let mut e = engine();
        // 300 ms capped to 250 ms; five steps run now, the rest waits.
        e.advance(0.300);
        assert_eq!(e.tick_count(), MAX_STEPS_PER_ADVANCE as u64);

        // The backlog drains over the following frames, still bounded
        // per call.
        let before = e.tick_count();
        e.advance(0.016);
        assert_eq!(e.tick_count() - before, MAX_STEPS_PER_ADVANCE as u64);

        e.advance(0.0);
        e.advance(0.0);
        // 266 ms of simulated time is fifteen whole timesteps.
        assert_eq!(e.tick_count(), 15);
    }

    #[test]
    fn dribbled_ball_rides_in_front_of_the_carrier() {
        let mut e = engine();
        e.field.ball.owner = Some(2);

        e.advance(1.0 / 60.0);

        let owner = e.field.player(2).unwrap();
        let distance = (e.field.ball.position - owner.position).norm();
        assert!((distance - DRIBBLE_OFFSET).abs() < 1e-3);
    }

    #[test]
    fn goal_scores_and_resets_to_kickoff() {
        let mut e = engine();
        // Drive the ball into the away goal mouth with a known scorer.
        e.field.ball.position = Vector3::new(104.0, 34.0, 0.5);
        e.field.ball.velocity = Vector3::new(30.0, 0.0, 0.0);
        e.field.ball.touch(2, Team::Home);

        let mut scored = false;
        for _ in 0..30 {
            let events = e.advance(1.0 / 60.0);
            if events
                .iter()
                .any(|ev| matches!(ev, MatchEvent::Goal { team: Team::Home, .. }))
            {
                scored = true;
                break;
            }
        }

        assert!(scored);
        assert_eq!(e.score().home, 1);
        // Kickoff spot restored.
        let center = Vector3::new(
            crate::constants::FIELD_LENGTH / 2.0,
            crate::constants::FIELD_WIDTH / 2.0,
            0.0,
        );
        assert!((e.field.ball.position - center).norm() < 1e-3);
    }

    #[test]
    fn same_seed_and_inputs_replay_identically() {
        let mut a = engine();
        let mut b = engine();

        for _ in 0..600 {
            a.advance(1.0 / 60.0);
            b.advance(1.0 / 60.0);
        }

        let sa = a.snapshot();
        let sb = b.snapshot();
        assert_eq!(sa.ball_position, sb.ball_position);
        assert_eq!(sa.score.home, sb.score.home);
        for (pa, pb) in sa.players.iter().zip(sb.players.iter()) {
            assert_eq!(pa.position, pb.position);
        }
    }

    #[test]
    fn control_is_never_handed_to_a_goalkeeper() {
        let mut e = engine();
        for _ in 0..1200 {
            e.advance(1.0 / 60.0);
            for player in &e.field.players {
                if player.role == PlayerRole::Goalkeeper {
                    assert!(!player.is_controlled);
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_starts_a_restart() {
        let mut e = engine();
        e.field.ball.position = Vector3::new(50.0, 67.8, 0.0);
        e.field.ball.velocity = Vector3::new(0.0, 15.0, 0.0);
        e.field.ball.touch(12, Team::Away);

        let mut restarted = false;
        for _ in 0..30 {
            let events = e.advance(1.0 / 60.0);
            if events.iter().any(|ev| {
                matches!(
                    ev,
                    MatchEvent::OutOfBounds {
                        restart: RestartKind::ThrowIn,
                        awarded_to: Team::Home,
                        ..
                    }
                )
            }) {
                restarted = true;
                break;
            }
        }

        assert!(restarted);
        assert!(e.setpieces.is_active());
    }

    #[test]
    fn long_run_keeps_state_sane() {
        let mut e = engine();
        // Two simulated minutes of unattended play.
        for _ in 0..7200 {
            e.advance(1.0 / 60.0);
        }

        let snapshot = e.snapshot();
        assert!(snapshot.ball_position.iter().all(|c| c.is_finite()));
        for player in &snapshot.players {
            assert!((0.0..=100.0).contains(&player.stamina));
            assert!(player.position.iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn open_play_freezes_once_the_shootout_starts() {
        let config = GameConfig {
            match_duration: 120.0,
            difficulty: Difficulty::Normal,
            extra_time_enabled: true,
            penalties_enabled: true,
            seed: 8,
        };
        // Goalkeepers only: nobody can score, so the match stays level.
        let players: Vec<MatchPlayer> = roster()
            .into_iter()
            .filter(|p| p.role == PlayerRole::Goalkeeper)
            .collect();
        let mut e = MatchEngine::new(config, players).unwrap();

        for _ in 0..100_000 {
            e.advance(1.0 / 60.0);
            if e.clock().phase() == MatchPhase::PenaltyShootout {
                break;
            }
        }
        assert_eq!(e.clock().phase(), MatchPhase::PenaltyShootout);

        // Ten seconds of frames later, nothing on the pitch has moved.
        let before = e.snapshot();
        for _ in 0..600 {
            e.advance(1.0 / 60.0);
        }
        let after = e.snapshot();

        assert_eq!(before.ball_position, after.ball_position);
        for (a, b) in before.players.iter().zip(after.players.iter()) {
            assert_eq!(a.position, b.position);
        }
        assert_eq!(after.score.home, 0);
        assert_eq!(after.score.away, 0);
    }

    #[test]
    fn finished_match_stops_advancing() {
        let mut e = engine();
        e.clock.finish();

        let events = e.advance(1.0);
        assert!(events.is_empty());
        assert_eq!(e.tick_count(), 0);
    }
}
