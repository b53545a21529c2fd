//! Domain value objects.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::reputation::{self, KarmaUpdate, Level};

/// Implements `as_str`, `Display`, case-insensitive `FromStr` and
/// `TryFrom<String>` for a unit-only enum stored as text.
macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Canonical lower-case representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(ModelError::InvalidEnum {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ModelError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

/// Kind of help a task asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Category {
    Repair,
    Delivery,
    Pets,
    Other,
}

text_enum!(Category, "category", {
    Repair => "repair",
    Delivery => "delivery",
    Pets => "pets",
    Other => "other",
});

/// Task lifecycle: open -> in_progress -> completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum TaskStatus {
    Open,
    InProgress,
    Completed,
}

text_enum!(TaskStatus, "task status", {
    Open => "open",
    InProgress => "in_progress",
    Completed => "completed",
});

impl TaskStatus {
    /// Whether a task in this status may move to `next`.
    ///
    /// Only forward moves are allowed. Staying put is a no-op and allowed.
    pub fn can_advance_to(&self, next: TaskStatus) -> bool {
        next >= *self
    }
}

/// How pressing a task is. Declaration order is the ranking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Urgent,
}

text_enum!(Urgency, "urgency", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

impl Urgency {
    /// Numeric rank used for ordering: urgent(4) > high(3) > medium(2) > low(1).
    pub fn rank(&self) -> u8 {
        match self {
            Urgency::Low => 1,
            Urgency::Medium => 2,
            Urgency::High => 3,
            Urgency::Urgent => 4,
        }
    }
}

/// Urgency as stored on a task.
///
/// `Derived` means the urgency is computed from the task's age every time it
/// is read. Serialized as an optional urgency string, `null` meaning derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Urgency>", into = "Option<Urgency>")]
pub enum UrgencySetting {
    Explicit(Urgency),
    #[default]
    Derived,
}

impl UrgencySetting {
    pub fn explicit(&self) -> Option<Urgency> {
        match self {
            UrgencySetting::Explicit(urgency) => Some(*urgency),
            UrgencySetting::Derived => None,
        }
    }
}

impl From<Option<Urgency>> for UrgencySetting {
    fn from(value: Option<Urgency>) -> Self {
        match value {
            Some(urgency) => UrgencySetting::Explicit(urgency),
            None => UrgencySetting::Derived,
        }
    }
}

impl From<UrgencySetting> for Option<Urgency> {
    fn from(value: UrgencySetting) -> Self {
        value.explicit()
    }
}

/// State of an offer to help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ResponseStatus {
    Pending,
    Accepted,
    Rejected,
}

text_enum!(ResponseStatus, "response status", {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

/// Aggregate counts attached to a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserCounts {
    /// Tasks the user authored.
    pub tasks: i64,
    /// Responses the user submitted.
    pub responses: i64,
}

/// A participant in the marketplace.
///
/// Karma and level are private so the level can never drift from the karma
/// it is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    /// Display name
    pub name: String,
    /// Phone number, unique per user
    pub phone: String,
    pub avatar: Option<String>,
    karma: i64,
    level: Level,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<UserCounts>,
}

impl User {
    /// Build a user, deriving the level from `karma`.
    ///
    /// Negative karma is rejected rather than clamped.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        phone: impl Into<String>,
        karma: i64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        if karma < 0 {
            return Err(ModelError::NegativeKarma(karma));
        }

        Ok(Self {
            id: id.into(),
            name: name.into(),
            phone: phone.into(),
            avatar: None,
            karma,
            level: reputation::level_for(karma),
            created_at,
            counts: None,
        })
    }

    pub fn with_avatar(mut self, avatar: Option<String>) -> Self {
        self.avatar = avatar;
        self
    }

    pub fn with_counts(mut self, counts: UserCounts) -> Self {
        self.counts = Some(counts);
        self
    }

    pub fn karma(&self) -> i64 {
        self.karma
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Apply a karma delta in place, clamping at zero.
    pub fn apply_karma_delta(&mut self, delta: i64) -> KarmaUpdate {
        let update = reputation::apply_delta(self.karma, delta);
        self.karma = update.karma;
        self.level = update.level;
        update
    }
}

/// A request for help.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: TaskStatus,
    #[serde(default)]
    pub urgency: UrgencySetting,
    pub reward: Option<i64>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    /// User who created the task
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    /// Number of responses, derived on read
    #[serde(default)]
    pub response_count: i64,
}

impl Task {
    /// New responses are accepted only while the task is open.
    pub fn accepts_responses(&self) -> bool {
        self.status == TaskStatus::Open
    }

    /// Time elapsed since creation at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }
}

/// One user's offer to help with a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: String,
    pub task_id: String,
    /// Responder
    pub user_id: String,
    pub message: Option<String>,
    pub status: ResponseStatus,
    pub created_at: DateTime<Utc>,
}
