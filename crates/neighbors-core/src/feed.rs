//! Feed ranking.
//!
//! Turns the caller's list of tasks into the ordered view shown to a user.
//! Every function here is stateless; urgency that depends on a task's age is
//! evaluated against the instant passed in, so the same task can rank
//! differently as time moves on.
//!
//! The pipeline order is fixed: category filter, then search, then sort.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::clock::Clock;
use crate::error::ModelError;
use crate::models::{Category, Task, Urgency, UrgencySetting};

/// Tasks younger than this are urgent.
pub const URGENT_WINDOW_HOURS: i64 = 2;

/// Tasks younger than this are high.
pub const HIGH_WINDOW_HOURS: i64 = 6;

/// Tasks younger than this are medium; anything older is low.
pub const MEDIUM_WINDOW_HOURS: i64 = 24;

/// Urgency implied by a task's age alone.
pub fn urgency_for_age(age: Duration) -> Urgency {
    if age < Duration::hours(URGENT_WINDOW_HOURS) {
        Urgency::Urgent
    } else if age < Duration::hours(HIGH_WINDOW_HOURS) {
        Urgency::High
    } else if age < Duration::hours(MEDIUM_WINDOW_HOURS) {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Urgency used for ranking: the explicit value if set, else derived from age.
pub fn effective_urgency(task: &Task, now: DateTime<Utc>) -> Urgency {
    match task.urgency {
        UrgencySetting::Explicit(urgency) => urgency,
        UrgencySetting::Derived => urgency_for_age(task.age(now)),
    }
}

/// Key of a [`CategoryCounts`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryKey {
    All,
    Category(Category),
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKey::All => f.write_str("all"),
            CategoryKey::Category(category) => f.write_str(category.as_str()),
        }
    }
}

impl Serialize for CategoryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Task totals per category plus an `all` entry.
///
/// Categories with no tasks are absent, not zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct CategoryCounts(BTreeMap<CategoryKey, usize>);

impl CategoryCounts {
    pub fn get(&self, key: CategoryKey) -> Option<usize> {
        self.0.get(&key).copied()
    }

    pub fn all(&self) -> usize {
        self.get(CategoryKey::All).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryKey, usize)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// Count tasks per category.
pub fn count_by_category(tasks: &[Task]) -> CategoryCounts {
    let mut counts = BTreeMap::new();
    counts.insert(CategoryKey::All, tasks.len());
    for task in tasks {
        *counts.entry(CategoryKey::Category(task.category)).or_insert(0) += 1;
    }
    CategoryCounts(counts)
}

/// Keep tasks whose title or description contains `query`, ignoring case.
///
/// Leading and trailing whitespace in `query` is ignored, so `" sink "`
/// matches the same tasks as `"sink"`. A blank query returns the input
/// untouched.
pub fn filter_by_search(tasks: Vec<Task>, query: &str) -> Vec<Task> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return tasks;
    }

    tasks
        .into_iter()
        .filter(|task| {
            task.title.to_lowercase().contains(&needle)
                || task.description.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Keep tasks of `category`; `None` keeps everything.
pub fn filter_by_category(tasks: Vec<Task>, category: Option<Category>) -> Vec<Task> {
    match category {
        Some(category) => tasks
            .into_iter()
            .filter(|task| task.category == category)
            .collect(),
        None => tasks,
    }
}

/// Most urgent first. Stable: equal urgency keeps input order.
pub fn sort_by_urgency(tasks: &mut [Task], now: DateTime<Utc>) {
    tasks.sort_by_key(|task| Reverse(effective_urgency(task, now).rank()));
}

/// Newest first. Stable: equal timestamps keep input order.
pub fn sort_by_date(tasks: &mut [Task]) {
    tasks.sort_by_key(|task| Reverse(task.created_at));
}

/// Feed ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum SortMode {
    #[default]
    Urgency,
    Date,
}

impl FromStr for SortMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "urgency" => Ok(SortMode::Urgency),
            "date" => Ok(SortMode::Date),
            _ => Err(ModelError::InvalidEnum {
                kind: "sort mode",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for SortMode {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User-controlled feed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedQuery {
    pub category: Option<Category>,
    pub search: String,
    pub sort: SortMode,
}

/// Filter and order `tasks` for display, evaluating urgency at `clock.now()`.
pub fn rank(tasks: Vec<Task>, query: &FeedQuery, clock: &dyn Clock) -> Vec<Task> {
    let tasks = filter_by_category(tasks, query.category);
    let mut tasks = filter_by_search(tasks, &query.search);

    match query.sort {
        SortMode::Urgency => sort_by_urgency(&mut tasks, clock.now()),
        SortMode::Date => sort_by_date(&mut tasks),
    }

    tasks
}
