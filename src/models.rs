// Typed views of the parts of Habitica's responses this client reads.
// Every field is defaulted so partial payloads still decode.

use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{HabitsError, Result};

/// Habitica wraps every payload as `{"success": true, "data": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Decode the `data` member of a response.
pub fn data<T: DeserializeOwned>(response: Value) -> Result<T> {
    serde_json::from_value::<Envelope<T>>(response)
        .map(|e| e.data)
        .map_err(|e| HabitsError::InvalidResponse(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Habit,
    Daily,
    Todo,
    Reward,
}

impl TaskKind {
    /// Section header used when listing tasks.
    pub fn header(self) -> &'static str {
        match self {
            TaskKind::Habit => "HABITS",
            TaskKind::Daily => "DAILIES",
            TaskKind::Todo => "TODOS",
            TaskKind::Reward => "REWARDS",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_due: bool,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub counter_up: i64,
    #[serde(default)]
    pub counter_down: i64,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub profile: Profile,
    pub stats: Stats,
    pub needs_cron: bool,
    pub last_cron: Option<String>,
    pub tasks_order: TasksOrder,
    pub party: Party,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stats {
    pub hp: f64,
    pub max_health: f64,
    pub exp: f64,
    pub to_next_level: f64,
    pub mp: f64,
    #[serde(rename = "maxMP")]
    pub max_mp: f64,
    pub gp: f64,
    pub lvl: u32,
    pub class: String,
}

/// Task ids in the order the user arranged them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TasksOrder {
    pub habits: Vec<String>,
    pub dailys: Vec<String>,
    pub todos: Vec<String>,
    pub rewards: Vec<String>,
}

impl TasksOrder {
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.habits
            .iter()
            .chain(&self.dailys)
            .chain(&self.todos)
            .chain(&self.rewards)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Party {
    pub quest: PartyQuest,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PartyQuest {
    pub progress: PendingProgress,
}

/// Quest progress the user has earned but that is only applied at cron.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PendingProgress {
    pub up: f64,
    pub collected_items: u64,
}

/// Result of scoring a task.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScoreResult {
    pub delta: f64,
    #[serde(rename = "_tmp")]
    pub tmp: Map<String, Value>,
}
