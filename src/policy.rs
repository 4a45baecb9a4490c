//! Turn and research policy
//!
//! Every switch that depends on the turn counter or the research level lives
//! here as a plain function of those numbers, so the grid stages never read
//! the clock themselves.

use crate::config::{AnalysisConfig, EngineConfig, RulesConfig};
use crate::world::ResourceKind;

/// Day/night arithmetic for a repeating cycle of `day_length` day turns
/// followed by night turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCycle {
    cycle_length: u32,
    day_length: u32,
    match_length: u32,
}

impl DayCycle {
    pub fn from_rules(rules: &RulesConfig) -> Self {
        Self {
            cycle_length: rules.cycle_length,
            day_length: rules.day_length,
            match_length: rules.match_length,
        }
    }

    pub fn night_length(&self) -> u32 {
        self.cycle_length - self.day_length
    }

    fn phase(&self, turn: u32) -> u32 {
        turn % self.cycle_length
    }

    pub fn is_day(&self, turn: u32) -> bool {
        self.phase(turn) < self.day_length
    }

    /// Turns until night falls; zero once it has.
    pub fn turns_to_night(&self, turn: u32) -> u32 {
        self.day_length.saturating_sub(self.phase(turn))
    }

    /// Turns until the night ends; zero during the day.
    pub fn turns_to_dawn(&self, turn: u32) -> u32 {
        if self.is_day(turn) {
            0
        } else {
            self.cycle_length - self.phase(turn)
        }
    }

    /// Night turns between `turn` and the end of the match.
    pub fn night_turns_left(&self, turn: u32) -> u32 {
        let remaining = self.match_length.saturating_sub(turn);
        remaining / self.cycle_length * self.night_length()
            + self.night_length().min(remaining % self.cycle_length)
    }
}

/// Research points and what they unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchLevel {
    pub points: i32,
}

impl ResearchLevel {
    pub fn new(points: i32) -> Self {
        Self { points }
    }

    pub fn can_collect(&self, kind: ResourceKind, rules: &RulesConfig) -> bool {
        self.points >= kind.rule(rules).research_required
    }

    /// The level expected shortly, `margin` points ahead of the current one.
    pub fn projected(&self, margin: i32) -> Self {
        Self::new(self.points + margin)
    }

    /// The most valuable resource beyond wood this level has unlocked.
    pub fn frontier(&self, rules: &RulesConfig) -> Option<ResourceKind> {
        if self.can_collect(ResourceKind::Uranium, rules) {
            Some(ResourceKind::Uranium)
        } else if self.can_collect(ResourceKind::Coal, rules) {
            Some(ResourceKind::Coal)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnPolicy {
    cycle: DayCycle,
    analysis: AnalysisConfig,
}

impl TurnPolicy {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cycle: DayCycle::from_rules(&config.rules),
            analysis: config.analysis.clone(),
        }
    }

    pub fn cycle(&self) -> &DayCycle {
        &self.cycle
    }

    /// First turns of each cycle, right after dawn.
    pub fn is_transition(&self, turn: u32) -> bool {
        turn % self.cycle.cycle_length <= self.analysis.transition_window
    }

    /// Delay points a mission loses on a turn its unit has not arrived.
    pub fn delay_decay(&self, turn: u32) -> f64 {
        if self.is_transition(turn) {
            0.5
        } else if self.cycle.is_day(turn) {
            1.0
        } else {
            0.5
        }
    }

    /// Early on the empty-tile floodfill is replaced by the buildable set.
    pub fn early_floodfill(&self, turn: u32) -> bool {
        turn <= self.analysis.early_game_turns
    }

    /// The last day turn, when new city tiles far from home are discouraged.
    pub fn citytile_build_pause(&self, turn: u32) -> bool {
        turn % self.cycle.cycle_length == self.cycle.day_length
    }

    pub fn worker_throttle(&self, turn: u32) -> bool {
        turn <= self.analysis.end_game_turn
    }
}
