use crate::fouls::{Card, FoulSeverity};
use std::collections::VecDeque;

/// Oldest entries fall off; a match never needs more history than this.
const HISTORY_LIMIT: usize = 32;
/// Fouls inside this window make the referee progressively less patient.
const FREQUENCY_WINDOW: f64 = 300.0;

/// Per-player foul and card history for one match.
#[derive(Debug, Default)]
pub struct DisciplinaryRecord {
    fouls: VecDeque<(f64, FoulSeverity)>,
    yellows: u8,
    sent_off: bool,
}

impl DisciplinaryRecord {
    pub fn record_foul(&mut self, clock: f64, severity: FoulSeverity) {
        if self.fouls.len() == HISTORY_LIMIT {
            self.fouls.pop_front();
        }
        self.fouls.push_back((clock, severity));
    }

    pub fn record_card(&mut self, card: Card) {
        match card {
            Card::Yellow => {
                self.yellows += 1;
                if self.yellows >= 2 {
                    self.sent_off = true;
                }
            }
            Card::Red => self.sent_off = true,
        }
    }

    pub fn yellows(&self) -> u8 {
        self.yellows
    }

    pub fn is_sent_off(&self) -> bool {
        self.sent_off
    }

    pub fn total_fouls(&self) -> usize {
        self.fouls.len()
    }

    /// Fouls committed inside the rolling frequency window.
    pub fn recent_fouls(&self, clock: f64) -> usize {
        self.fouls
            .iter()
            .filter(|(at, _)| clock - at <= FREQUENCY_WINDOW)
            .count()
    }

    /// Card-probability multiplier for persistent offenders. The first
    /// recent foul is free; each further one adds a quarter, capped at 2x.
    pub fn frequency_boost(&self, clock: f64) -> f32 {
        let recent = self.recent_fouls(clock);
        (1.0 + 0.25 * recent.saturating_sub(1) as f32).min(2.0)
    }
}
