// Habitica's day rollover ("cron").
//
// Scoring before the day has rolled over would credit yesterday, so commands
// that score run cron first when needed. A marker file in the cache
// directory remembers the last known cron through its mtime, which saves a
// `GET /user` on every invocation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Days, Local, NaiveTime, TimeZone, Utc};
use tracing::{debug, info};

use crate::api::Api;
use crate::error::Result;
use crate::models::{self, User};

pub struct Cron {
    marker: PathBuf,
    day_start: NaiveTime,
}

impl Cron {
    /// `day_start` is the local hour at which a new Habitica day begins.
    pub fn new(marker: impl Into<PathBuf>, day_start: u32) -> Self {
        Cron {
            marker: marker.into(),
            day_start: NaiveTime::from_hms_opt(day_start.min(23), 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    /// Run cron unless the marker shows it already happened today. Returns
    /// whether a new day was started.
    pub fn run_if_needed<A: Api, W: Write>(&self, api: &A, out: &mut W) -> Result<bool> {
        let scheduled = last_scheduled_cron(&Local::now(), self.day_start).with_timezone(&Utc);
        if let Some(mtime) = self.marker_time() {
            if mtime >= scheduled {
                debug!(%mtime, %scheduled, "cron marker is current");
                return Ok(false);
            }
        }
        let user: User = models::data(api.get("/user")?)?;
        if user.needs_cron {
            self.run(api, out)?;
            Ok(true)
        } else {
            let last = user
                .last_cron
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc));
            self.touch(last)?;
            Ok(false)
        }
    }

    /// Start a new day unconditionally.
    pub fn run<A: Api, W: Write>(&self, api: &A, out: &mut W) -> Result<()> {
        api.post("/cron", None)?;
        info!("cron complete");
        writeln!(out, "Started a new Habitica day")?;
        self.touch(None)
    }

    fn marker_time(&self) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(&self.marker).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Create the marker and set its mtime to `at` (now when `None`).
    fn touch(&self, at: Option<DateTime<Utc>>) -> Result<()> {
        if let Some(parent) = self.marker.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.marker)?;
        let when = at.map_or_else(SystemTime::now, SystemTime::from);
        file.set_modified(when)?;
        Ok(())
    }
}

/// Marker file for `user` under the cache directory. Each account gets its
/// own so one user's cron never hides another's.
pub fn marker_path(cache_root: &Path, user: &str) -> PathBuf {
    let safe: String = user
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    cache_root.join(format!("cron-{safe}"))
}

/// Most recent moment at which the day started, as of `now`.
pub fn last_scheduled_cron<Tz: TimeZone>(now: &DateTime<Tz>, day_start: NaiveTime) -> DateTime<Tz> {
    let today = now.date_naive();
    let date = if now.time() >= day_start {
        today
    } else {
        today.checked_sub_days(Days::new(1)).unwrap_or(today)
    };
    let naive = date.and_time(day_start);
    let tz = now.timezone();
    // a DST gap can swallow the start hour; fall back to reading it as UTC
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}
