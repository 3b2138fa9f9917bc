use serde::{Deserialize, Serialize};
use std::fmt;

/// Bounded mastery counter. Persisted as the bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PromotionLevel(u8);

impl PromotionLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    /// Clamp any integer into range. Used when migrating foreign data.
    pub fn clamped(level: i64) -> Self {
        Self(level.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_mastered(self) -> bool {
        self.0 == Self::MAX
    }

    /// Level after answering a card: one step up on success (capped), back to 1 on failure.
    pub fn after_answer(self, correct: bool) -> Self {
        if correct {
            Self((self.0 + 1).min(Self::MAX))
        } else {
            Self::default()
        }
    }
}

impl Default for PromotionLevel {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u8> for PromotionLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "promotion level {} outside {}..={}",
                value,
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<PromotionLevel> for u8 {
    fn from(level: PromotionLevel) -> Self {
        level.0
    }
}

impl fmt::Display for PromotionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
