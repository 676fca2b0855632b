use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One of the three stochastic noise algorithms. Stored as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseVariant {
    White,
    Brown,
    Pink,
}

impl NoiseVariant {
    /// Variants in menu order
    pub const ALL: [NoiseVariant; 3] = [NoiseVariant::White, NoiseVariant::Brown, NoiseVariant::Pink];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseVariant::White => "white",
            NoiseVariant::Brown => "brown",
            NoiseVariant::Pink => "pink",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NoiseVariant::White => "White",
            NoiseVariant::Brown => "Brown",
            NoiseVariant::Pink => "Pink",
        }
    }
}

impl fmt::Display for NoiseVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for NoiseVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(NoiseVariant::White),
            "brown" => Ok(NoiseVariant::Brown),
            "pink" => Ok(NoiseVariant::Pink),
            other => Err(format!("unknown noise variant '{other}'")),
        }
    }
}

/// Focus phase length choices, persisted as whole minutes (0 = infinite).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleDuration {
    #[default]
    Infinite,
    Thirty,
    Forty,
    Sixty,
}

impl CycleDuration {
    pub const ALL: [CycleDuration; 4] = [
        CycleDuration::Infinite,
        CycleDuration::Thirty,
        CycleDuration::Forty,
        CycleDuration::Sixty,
    ];

    pub fn minutes(&self) -> u32 {
        match self {
            CycleDuration::Infinite => 0,
            CycleDuration::Thirty => 30,
            CycleDuration::Forty => 40,
            CycleDuration::Sixty => 60,
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.minutes() == minutes)
    }

    /// `None` means the focus phase never ends.
    pub fn duration(&self) -> Option<Duration> {
        minutes_to_duration(self.minutes())
    }

    pub fn display_name(&self) -> String {
        match self {
            CycleDuration::Infinite => "∞".to_string(),
            d => d.minutes().to_string(),
        }
    }
}

/// Rest phase length choices, persisted as whole minutes (0 = no rest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestDuration {
    #[default]
    None,
    Five,
    Ten,
    Fifteen,
}

impl RestDuration {
    pub const ALL: [RestDuration; 4] = [
        RestDuration::None,
        RestDuration::Five,
        RestDuration::Ten,
        RestDuration::Fifteen,
    ];

    pub fn minutes(&self) -> u32 {
        match self {
            RestDuration::None => 0,
            RestDuration::Five => 5,
            RestDuration::Ten => 10,
            RestDuration::Fifteen => 15,
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.minutes() == minutes)
    }

    /// `None` means the rest phase is skipped.
    pub fn duration(&self) -> Option<Duration> {
        minutes_to_duration(self.minutes())
    }

    pub fn display_name(&self) -> String {
        match self {
            RestDuration::None => "N/A".to_string(),
            d => d.minutes().to_string(),
        }
    }
}

fn minutes_to_duration(minutes: u32) -> Option<Duration> {
    (minutes > 0).then(|| Duration::from_secs(u64::from(minutes) * 60))
}

/// Countdown text in `M:SS` form, truncated to whole seconds.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
