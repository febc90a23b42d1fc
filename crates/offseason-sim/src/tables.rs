// Age-bracket heuristics for minutes and shooting percentages.
//
// Each table is a discrete distribution over deltas: a uniform draw `u` in
// [0, 1) selects the first step whose bound exceeds it, and anything past
// the last bound takes `otherwise`.

use serde::Serialize;

pub const MAX_MINUTES: f64 = 38.0;
pub const BREAKOUT_MINUTES_CAP: f64 = 36.0;
/// Points per minute at or above which a young player may break out.
pub const BREAKOUT_PTS_PER_MIN: f64 = 0.5;
/// Breakouts only happen for players below this many minutes per game.
pub const BREAKOUT_MAX_MINUTES: f64 = 28.0;

/// Age bracket of the projected (next-season) age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBracket {
    /// Under 25.
    Rising,
    /// 25 through 30.
    Prime,
    /// 31 through 34.
    Veteran,
    /// 35 and over.
    Twilight,
}

impl AgeBracket {
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=24 => AgeBracket::Rising,
            25..=30 => AgeBracket::Prime,
            31..=34 => AgeBracket::Veteran,
            _ => AgeBracket::Twilight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaTable {
    steps: &'static [(f64, f64)],
    otherwise: f64,
}

impl DeltaTable {
    pub fn delta(&self, u: f64) -> f64 {
        self.steps
            .iter()
            .find(|(bound, _)| u < *bound)
            .map(|(_, delta)| *delta)
            .unwrap_or(self.otherwise)
    }
}

const BREAKOUT_MINUTES: DeltaTable = DeltaTable {
    steps: &[(0.2, 10.0), (0.5, 6.0)],
    otherwise: 3.0,
};
const RISING_MINUTES: DeltaTable = DeltaTable {
    steps: &[(0.3, 2.0), (0.6, 1.0), (0.8, 0.0)],
    otherwise: -1.0,
};
const PRIME_MINUTES: DeltaTable = DeltaTable {
    steps: &[(0.3, 0.0), (0.6, 1.0), (0.9, -1.0)],
    otherwise: -2.0,
};
const VETERAN_MINUTES: DeltaTable = DeltaTable {
    steps: &[(0.4, -1.0), (0.8, -2.0)],
    otherwise: 0.0,
};
const TWILIGHT_MINUTES: DeltaTable = DeltaTable {
    steps: &[(0.6, -3.0), (0.9, -2.0)],
    otherwise: -1.0,
};

const RISING_SHOOTING: DeltaTable = DeltaTable {
    steps: &[(0.3, 0.02), (0.6, 0.01), (0.9, 0.0)],
    otherwise: -0.01,
};
const PRIME_SHOOTING: DeltaTable = DeltaTable {
    steps: &[(0.1, 0.02), (0.4, 0.01), (0.8, 0.0)],
    otherwise: -0.01,
};
const VETERAN_SHOOTING: DeltaTable = DeltaTable {
    steps: &[(0.1, 0.01), (0.6, 0.0)],
    otherwise: -0.01,
};
const TWILIGHT_SHOOTING: DeltaTable = DeltaTable {
    steps: &[(0.3, 0.0), (0.65, -0.01), (0.9, -0.02)],
    otherwise: 0.01,
};

pub fn minutes_table(bracket: AgeBracket, breakout: bool) -> &'static DeltaTable {
    match bracket {
        AgeBracket::Rising if breakout => &BREAKOUT_MINUTES,
        AgeBracket::Rising => &RISING_MINUTES,
        AgeBracket::Prime => &PRIME_MINUTES,
        AgeBracket::Veteran => &VETERAN_MINUTES,
        AgeBracket::Twilight => &TWILIGHT_MINUTES,
    }
}

pub fn shooting_table(bracket: AgeBracket) -> &'static DeltaTable {
    match bracket {
        AgeBracket::Rising => &RISING_SHOOTING,
        AgeBracket::Prime => &PRIME_SHOOTING,
        AgeBracket::Veteran => &VETERAN_SHOOTING,
        AgeBracket::Twilight => &TWILIGHT_SHOOTING,
    }
}

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn is_breakout(bracket: AgeBracket, pts_per_min_last: f64, minutes_last: f64) -> bool {
    bracket == AgeBracket::Rising
        && pts_per_min_last >= BREAKOUT_PTS_PER_MIN
        && minutes_last < BREAKOUT_MAX_MINUTES
}

/// Next-season minutes per game, in [0, 38] with one decimal.
pub fn project_minutes(minutes_last: f64, bracket: AgeBracket, breakout: bool, u: f64) -> f64 {
    let mut minutes = minutes_last + minutes_table(bracket, breakout).delta(u);
    if bracket == AgeBracket::Rising && breakout {
        minutes = minutes.min(BREAKOUT_MINUTES_CAP);
    }
    round1(minutes.clamp(0.0, MAX_MINUTES))
}

/// Next-season shooting percentage, in [0, 1] with two decimals.
pub fn adjust_shooting(pct: f64, bracket: AgeBracket, u: f64) -> f64 {
    round2((pct + shooting_table(bracket).delta(u)).clamp(0.0, 1.0))
}
