// One function per subcommand. Each takes the API, its parsed arguments and
// the writer to print to; errors propagate unchanged to the entry point.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde_json::Value;

use crate::api::Api;
use crate::error::{HabitsError, Result};
use crate::models::{self, ScoreResult, Task, TaskKind, User};
use crate::ui::{self, Palette};

/// Which way to score a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// Check off or +1
    Up,
    /// Uncheck or -1
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// A task argument after alias lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    /// What the user typed.
    pub name: String,
    pub id: String,
}

/// Map task arguments to task ids. Aliases win; UUIDs pass through; anything
/// else is a usage error, reported before any request is made.
pub fn resolve_tasks(args: &[String], aliases: &BTreeMap<String, String>) -> Result<Vec<TaskRef>> {
    args.iter()
        .map(|arg| {
            let id = match aliases.get(arg) {
                Some(id) => id.clone(),
                None if looks_like_uuid(arg) => arg.to_lowercase(),
                None => return Err(HabitsError::Usage(format!("{arg}: unknown task"))),
            };
            Ok(TaskRef {
                name: arg.clone(),
                id,
            })
        })
        .collect()
}

fn looks_like_uuid(s: &str) -> bool {
    s.len() == 36
        && s.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// Score each task in turn and report what happened.
pub fn score<A: Api, W: Write>(
    api: &A,
    tasks: &[TaskRef],
    direction: Direction,
    show_json: bool,
    out: &mut W,
) -> Result<()> {
    for task in tasks {
        let path = format!("/tasks/{}/score/{}", task.id, direction.as_str());
        let response = api.post(&path, None)?;
        if show_json {
            ui::write_json(out, &response)?;
            continue;
        }
        let result: ScoreResult = models::data(response)?;
        writeln!(out, "{}: {:+.2}", task.name, result.delta)?;
        for line in score_events(&result.tmp)? {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

/// Human-readable lines for the side effects reported in `_tmp`.
fn score_events(tmp: &serde_json::Map<String, Value>) -> Result<Vec<String>> {
    let mut events: Vec<_> = tmp.iter().collect();
    events.sort_by(|a, b| a.0.cmp(b.0));
    let mut lines = Vec::new();
    for (event, about) in events {
        match event.as_str() {
            "quest" => {
                if let Some(delta) = about.get("progressDelta") {
                    lines.push(format!("QUEST: Damage to boss: {delta}"));
                }
                let collected = about.get("collection").and_then(Value::as_u64).unwrap_or(0);
                if collected > 0 {
                    let s = if collected > 1 { "s" } else { "" };
                    lines.push(format!("QUEST: Collected {collected} quest item{s}"));
                }
            }
            "drop" => {
                let dialog = about.get("dialog").and_then(Value::as_str).unwrap_or("");
                lines.push(format!("DROP: {dialog}"));
            }
            "crit" => lines.push("CRITICAL HIT!".to_string()),
            "streakBonus" => {}
            "leveledUp" => lines.push("LEVEL UP!".to_string()),
            other => {
                lines.push(format!("{other}:"));
                lines.push(serde_json::to_string_pretty(about).map_err(|e| {
                    HabitsError::InvalidResponse(e.to_string())
                })?);
            }
        }
    }
    Ok(lines)
}

/// List task titles grouped by type.
pub fn list_tasks<A: Api, W: Write>(
    api: &A,
    kind: Option<TaskKind>,
    show_ids: bool,
    out: &mut W,
) -> Result<()> {
    let tasks: Vec<Task> = models::data(api.get("/tasks/user")?)?;
    let kinds = [TaskKind::Habit, TaskKind::Daily, TaskKind::Todo, TaskKind::Reward];
    for k in kinds.into_iter().filter(|k| kind.map_or(true, |want| want == *k)) {
        let group: Vec<&Task> = tasks.iter().filter(|t| t.kind == k).collect();
        if group.is_empty() {
            continue;
        }
        writeln!(out, "{}", k.header())?;
        for t in group {
            if show_ids {
                writeln!(out, "  {}  {}", t.id, t.text)?;
            } else {
                writeln!(out, "  {}", t.text)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Show health, experience, mana and gold.
pub fn stats<A: Api, W: Write>(api: &A, out: &mut W) -> Result<()> {
    let user: User = models::data(api.get("/user")?)?;
    let s = &user.stats;
    let mut heading = format!("{}: level {}", user.profile.name, s.lvl);
    if !s.class.is_empty() {
        heading.push(' ');
        heading.push_str(&s.class);
    }
    writeln!(out, "{heading}")?;
    writeln!(out, "HP:   {} / {}", num(s.hp), num(s.max_health))?;
    writeln!(out, "XP:   {} / {}", num(s.exp), num(s.to_next_level))?;
    writeln!(out, "MP:   {} / {}", num(s.mp), num(s.max_mp))?;
    writeln!(out, "Gold: {:.2}", s.gp)?;
    Ok(())
}

fn num(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{x:.0}")
    } else {
        format!("{x:.1}")
    }
}

/// Show cron state and today's progress on habits, dailies and rewards.
/// Only aliased tasks are shown unless `show_all`.
pub fn status<A: Api, W: Write>(
    api: &A,
    aliases: &BTreeMap<String, String>,
    show_all: bool,
    palette: Palette,
    out: &mut W,
) -> Result<()> {
    let user: User = models::data(api.get("/user")?)?;
    let marker = if user.needs_cron {
        palette.red("!", true)
    } else {
        palette.green("✓", false)
    };
    let last_cron = match user.last_cron.as_deref().map(DateTime::parse_from_rfc3339) {
        Some(Ok(t)) => t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        Some(Err(e)) => return Err(HabitsError::InvalidResponse(format!("lastCron: {e}"))),
        None => "never".to_string(),
    };
    writeln!(out, "{marker} Last cron: {last_cron}")?;

    let tasks: Vec<Task> = models::data(api.get("/tasks/user")?)?;
    let lines: BTreeMap<&str, String> = tasks
        .iter()
        .filter_map(|t| status_line(t, palette).map(|line| (t.id.as_str(), line)))
        .collect();

    let order = &user.tasks_order;
    let to_show: HashSet<&str> = if show_all {
        order.all().map(String::as_str).collect()
    } else {
        aliases.values().map(String::as_str).collect()
    };
    for (header, ids) in [
        ("HABITS", &order.habits),
        ("DAILIES", &order.dailys),
        ("REWARDS", &order.rewards),
    ] {
        writeln!(out, "{header}")?;
        for id in ids.iter().filter(|id| to_show.contains(id.as_str())) {
            if let Some(line) = lines.get(id.as_str()) {
                writeln!(out, "{line}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One status line, or `None` for todos.
fn status_line(task: &Task, palette: Palette) -> Option<String> {
    let mark = match task.kind {
        TaskKind::Daily if task.is_due => {
            if task.completed {
                palette.green("[✓]", false)
            } else {
                palette.red("[ ]", false)
            }
        }
        TaskKind::Daily => (if task.completed { "[✓]" } else { "[-]" }).to_string(),
        TaskKind::Habit => {
            let up = if task.up {
                let n = format!("{:+3}", task.counter_up);
                if task.counter_up > 0 {
                    palette.green(&n, false)
                } else {
                    n
                }
            } else {
                " - ".to_string()
            };
            let down = if task.down {
                let n = format!("-{:<2}", task.counter_down);
                if task.counter_down > 0 {
                    palette.red(&n, false)
                } else {
                    n
                }
            } else {
                " - ".to_string()
            };
            format!("[{up}/{down}]")
        }
        TaskKind::Reward => format!("${}", task.value),
        TaskKind::Todo => return None,
    };
    Some(format!("{mark} {}", task.text))
}

/// Show progress on the party's current quest.
pub fn quest<A: Api, W: Write>(api: &A, out: &mut W) -> Result<()> {
    let party = models::data::<Value>(api.get("/groups/party")?)?;
    let current = &party["quest"];
    let key = current.get("key").and_then(Value::as_str);
    let active = current.get("active").and_then(Value::as_bool) != Some(false);
    let Some(key) = key.filter(|_| active) else {
        writeln!(out, "Not currently on a quest")?;
        return Ok(());
    };
    let progress = &current["progress"];

    let user: User = models::data(api.get("/user")?)?;
    let pending = &user.party.quest.progress;
    let content = models::data::<Value>(api.get("/content")?)?;
    let info = content
        .get("quests")
        .and_then(|q| q.get(key))
        .ok_or_else(|| HabitsError::InvalidResponse(format!("unknown quest {key:?}")))?;

    writeln!(out, "{}", info["text"].as_str().unwrap_or(key))?;
    if let Some(boss) = info.get("boss") {
        writeln!(
            out,
            "HP: {} / {} (Pending: {})",
            progress["hp"],
            boss["hp"],
            num(pending.up)
        )?;
        if let Some(rage) = boss.get("rage").filter(|r| !r.is_null()) {
            writeln!(out, "Rage: {} / {}", progress["rage"], rage["value"])?;
        }
    } else if let Some(collect) = info.get("collect").and_then(Value::as_object) {
        for (item, goal) in collect {
            let have = progress["collect"].get(item).and_then(Value::as_u64).unwrap_or(0);
            writeln!(
                out,
                "{}: {} / {}",
                goal["text"].as_str().unwrap_or(item),
                have,
                goal["count"]
            )?;
        }
        writeln!(out, "Pending: {}", pending.collected_items)?;
    } else {
        ui::write_json(out, progress)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use serde_json::json;

    const FLOSS: &str = "5b2a0c0e-1f4c-4e3a-9c1e-2f7d8a6b9c01";

    fn aliases() -> BTreeMap<String, String> {
        BTreeMap::from([("floss".to_string(), FLOSS.to_string())])
    }

    fn run<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn resolves_aliases_and_uuids() {
        let upper = "7E1F2D3C-4B5A-4697-8A1B-C2D3E4F5A6B7";
        let refs = resolve_tasks(&["floss".into(), upper.into()], &aliases()).unwrap();
        assert_eq!(refs[0].id, FLOSS);
        assert_eq!(refs[1].id, upper.to_lowercase());
        assert_eq!(refs[1].name, upper);
    }

    #[test]
    fn unknown_task_is_usage_error() {
        let err = resolve_tasks(&["floss".into(), "gym".into()], &aliases()).unwrap_err();
        assert!(matches!(err, HabitsError::Usage(ref m) if m == "gym: unknown task"));
    }

    #[test]
    fn score_prints_delta_and_events() {
        let api = FakeApi::new().on(
            &format!("POST /tasks/{FLOSS}/score/up"),
            json!({"success": true, "data": {
                "delta": 1.2345,
                "_tmp": {
                    "streakBonus": 0.5,
                    "quest": {"progressDelta": 2.5, "collection": 2},
                    "drop": {"dialog": "You found a Wolf Egg!"},
                    "crit": 1.5,
                    "leveledUp": {"lvl": 8}
                }
            }}),
        );
        let tasks = resolve_tasks(&["floss".into()], &aliases()).unwrap();
        let text = run(|out| score(&api, &tasks, Direction::Up, false, out));
        assert_eq!(
            text,
            "floss: +1.23\n\
             CRITICAL HIT!\n\
             DROP: You found a Wolf Egg!\n\
             LEVEL UP!\n\
             QUEST: Damage to boss: 2.5\n\
             QUEST: Collected 2 quest items\n"
        );
    }

    #[test]
    fn score_down_reports_negative_delta_and_unknown_events() {
        let api = FakeApi::new().on(
            &format!("POST /tasks/{FLOSS}/score/down"),
            json!({"data": {"delta": -0.5, "_tmp": {"mystery": {"a": 1}}}}),
        );
        let tasks = resolve_tasks(&["floss".into()], &aliases()).unwrap();
        let text = run(|out| score(&api, &tasks, Direction::Down, false, out));
        assert_eq!(text, "floss: -0.50\nmystery:\n{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn score_can_dump_json() {
        let response = json!({"data": {"delta": 1.0, "_tmp": {}}});
        let api = FakeApi::new().on(&format!("POST /tasks/{FLOSS}/score/up"), response.clone());
        let tasks = resolve_tasks(&["floss".into()], &aliases()).unwrap();
        let text = run(|out| score(&api, &tasks, Direction::Up, true, out));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn score_propagates_http_errors() {
        let api = FakeApi::new().fail(
            &format!("POST /tasks/{FLOSS}/score/up"),
            404,
            "Task not found.",
        );
        let tasks = resolve_tasks(&["floss".into()], &aliases()).unwrap();
        let mut out = Vec::new();
        let err = score(&api, &tasks, Direction::Up, false, &mut out).unwrap_err();
        assert!(err.to_string().contains("Task not found."));
        assert!(out.is_empty());
    }

    fn task_list() -> Value {
        json!({"data": [
            {"id": "h1", "type": "habit", "text": "Floss", "up": true, "down": true, "counterUp": 2, "counterDown": 1},
            {"id": "h2", "type": "habit", "text": "Snack", "up": false, "down": true, "counterDown": 0},
            {"id": "d1", "type": "daily", "text": "Stretch", "isDue": true, "completed": false},
            {"id": "d2", "type": "daily", "text": "Water plants", "isDue": false, "completed": false},
            {"id": "d3", "type": "daily", "text": "Read", "isDue": true, "completed": true},
            {"id": "t1", "type": "todo", "text": "File taxes"},
            {"id": "r1", "type": "reward", "text": "Coffee", "value": 10}
        ]})
    }

    #[test]
    fn lists_tasks_grouped_by_type() {
        let api = FakeApi::new().on("GET /tasks/user", task_list());
        let text = run(|out| list_tasks(&api, None, false, out));
        assert_eq!(
            text,
            "HABITS\n  Floss\n  Snack\n\n\
             DAILIES\n  Stretch\n  Water plants\n  Read\n\n\
             TODOS\n  File taxes\n\n\
             REWARDS\n  Coffee\n\n"
        );
    }

    #[test]
    fn lists_one_type_with_ids() {
        let api = FakeApi::new().on("GET /tasks/user", task_list());
        let text = run(|out| list_tasks(&api, Some(TaskKind::Todo), true, out));
        assert_eq!(text, "TODOS\n  t1  File taxes\n\n");
    }

    #[test]
    fn stats_shows_levels_and_pools() {
        let api = FakeApi::new().on(
            "GET /user",
            json!({"data": {
                "profile": {"name": "Ada"},
                "stats": {"hp": 42.5, "maxHealth": 50, "exp": 120, "toNextLevel": 330,
                          "mp": 31, "maxMP": 40, "gp": 12.5, "lvl": 7, "class": "wizard"}
            }}),
        );
        let text = run(|out| stats(&api, out));
        assert_eq!(
            text,
            "Ada: level 7 wizard\n\
             HP:   42.5 / 50\n\
             XP:   120 / 330\n\
             MP:   31 / 40\n\
             Gold: 12.50\n"
        );
    }

    fn user_for_status(needs_cron: bool) -> Value {
        json!({"data": {
            "needsCron": needs_cron,
            "lastCron": "2024-03-09T09:00:00.000Z",
            "tasksOrder": {
                "habits": ["h1", "h2"],
                "dailys": ["d1", "d2", "d3"],
                "todos": ["t1"],
                "rewards": ["r1"]
            }
        }})
    }

    #[test]
    fn status_shows_all_tasks() {
        let api = FakeApi::new()
            .on("GET /user", user_for_status(false))
            .on("GET /tasks/user", task_list());
        let text = run(|out| status(&api, &BTreeMap::new(), true, Palette::plain(), out));
        let (first, rest) = text.split_once('\n').unwrap();
        assert!(first.starts_with("✓ Last cron: 2024-03-"), "{first}");
        assert_eq!(
            rest,
            "HABITS\n[ +2/-1 ] Floss\n[ - /-0 ] Snack\n\n\
             DAILIES\n[ ] Stretch\n[-] Water plants\n[✓] Read\n\n\
             REWARDS\n$10 Coffee\n\n"
        );
    }

    #[test]
    fn status_defaults_to_aliased_tasks() {
        let api = FakeApi::new()
            .on("GET /user", user_for_status(true))
            .on("GET /tasks/user", task_list());
        let aliases = BTreeMap::from([("stretch".to_string(), "d1".to_string())]);
        let text = run(|out| status(&api, &aliases, false, Palette::plain(), out));
        assert!(text.starts_with("! Last cron:"));
        assert!(text.ends_with("HABITS\n\nDAILIES\n[ ] Stretch\n\nREWARDS\n\n"));
    }

    #[test]
    fn quest_without_party_quest() {
        let api = FakeApi::new().on("GET /groups/party", json!({"data": {"quest": {}}}));
        let text = run(|out| quest(&api, out));
        assert_eq!(text, "Not currently on a quest\n");
        assert_eq!(api.calls(), ["GET /groups/party"]);
    }

    #[test]
    fn quest_inactive_is_not_a_quest() {
        let api = FakeApi::new().on(
            "GET /groups/party",
            json!({"data": {"quest": {"key": "rat", "active": false}}}),
        );
        assert_eq!(run(|out| quest(&api, out)), "Not currently on a quest\n");
    }

    #[test]
    fn quest_boss_progress() {
        let api = FakeApi::new()
            .on(
                "GET /groups/party",
                json!({"data": {"quest": {"key": "rat", "active": true, "progress": {"hp": 321.5, "rage": 12}}}}),
            )
            .on("GET /user", json!({"data": {"party": {"quest": {"progress": {"up": 7.5}}}}}))
            .on(
                "GET /content",
                json!({"data": {"quests": {"rat": {"text": "The Rat King", "boss": {"hp": 1200, "rage": {"value": 500}}}}}}),
            );
        let text = run(|out| quest(&api, out));
        assert_eq!(
            text,
            "The Rat King\nHP: 321.5 / 1200 (Pending: 7.5)\nRage: 12 / 500\n"
        );
    }

    #[test]
    fn quest_collection_progress() {
        let api = FakeApi::new()
            .on(
                "GET /groups/party",
                json!({"data": {"quest": {"key": "eggs", "progress": {"collect": {"plainEgg": 14}}}}}),
            )
            .on("GET /user", json!({"data": {"party": {"quest": {"progress": {"collectedItems": 3}}}}}))
            .on(
                "GET /content",
                json!({"data": {"quests": {"eggs": {"text": "Egg Hunt", "collect": {"plainEgg": {"text": "Plain Eggs", "count": 40}}}}}}),
            );
        let text = run(|out| quest(&api, out));
        assert_eq!(text, "Egg Hunt\nPlain Eggs: 14 / 40\nPending: 3\n");
    }
}
