use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Regime {
    /// Growth up, inflation down.
    Goldilocks,
    /// Growth up, inflation up.
    Reflation,
    /// Growth down, inflation up.
    Stagflation,
    /// Growth down, inflation down, or the panic override.
    Deflation,
}

impl Regime {
    pub const ALL: [Regime; 4] = [
        Regime::Goldilocks,
        Regime::Reflation,
        Regime::Stagflation,
        Regime::Deflation,
    ];

    pub fn code(self) -> u8 {
        match self {
            Self::Goldilocks => 1,
            Self::Reflation => 2,
            Self::Stagflation => 3,
            Self::Deflation => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Goldilocks),
            2 => Some(Self::Reflation),
            3 => Some(Self::Stagflation),
            4 => Some(Self::Deflation),
            _ => None,
        }
    }

    /// Fixed quadrant lookup for adjusted directions.
    pub fn from_directions(growth: Direction, inflation: Direction) -> Self {
        match (growth, inflation) {
            (Direction::Up, Direction::Down) => Self::Goldilocks,
            (Direction::Up, Direction::Up) => Self::Reflation,
            (Direction::Down, Direction::Up) => Self::Stagflation,
            (Direction::Down, Direction::Down) => Self::Deflation,
        }
    }
}

impl TryFrom<u8> for Regime {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("invalid regime code {}", code))
    }
}

impl From<Regime> for u8 {
    fn from(regime: Regime) -> u8 {
        regime.code()
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimeSource {
    MacroQuadrant,
    MarketCircuit,
}

impl RegimeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MacroQuadrant => "MACRO_QUADRANT",
            Self::MarketCircuit => "MARKET_CIRCUIT",
        }
    }
}

/// Every (regime, source) pair the classifier can emit.
pub const REACHABLE_KEYS: [(Regime, RegimeSource); 5] = [
    (Regime::Goldilocks, RegimeSource::MacroQuadrant),
    (Regime::Reflation, RegimeSource::MacroQuadrant),
    (Regime::Stagflation, RegimeSource::MacroQuadrant),
    (Regime::Deflation, RegimeSource::MacroQuadrant),
    (Regime::Deflation, RegimeSource::MarketCircuit),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn sign(self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl From<Direction> for i8 {
    fn from(d: Direction) -> i8 {
        d.sign()
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(format!("invalid direction {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSignal {
    pub date: NaiveDate,
    pub regime: Regime,
    pub source: RegimeSource,
    pub growth_direction: Direction,
    pub inflation_direction: Direction,
    pub stress_score: f64,
    pub growth_trend: f64,
    pub inflation_trend: f64,
}

impl RegimeSignal {
    pub fn key(&self) -> (Regime, RegimeSource) {
        (self.regime, self.source)
    }
}
