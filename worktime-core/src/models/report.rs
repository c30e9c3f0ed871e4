//! Aggregated session time over a date window

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::id::{ProjectId, UserId};
use crate::{Error, Result};

/// Inclusive calendar-day range, queried as the half-open timestamp window
/// `[from 00:00 UTC, to 00:00 UTC + 1 day)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl SummaryRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if to < from {
            return Err(Error::InvalidInput("to must not be before from".to_string()));
        }
        if to.succ_opt().is_none() {
            return Err(Error::InvalidInput("to is out of range".to_string()));
        }
        Ok(Self { from, to })
    }

    /// Parse query parameters in `YYYY-MM-DD` or RFC 3339 form.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let (Some(from), Some(to)) = (
            from.map(str::trim).filter(|s| !s.is_empty()),
            to.map(str::trim).filter(|s| !s.is_empty()),
        ) else {
            return Err(Error::InvalidInput("from and to are required".to_string()));
        };

        let from = parse_day(from)
            .ok_or_else(|| Error::InvalidInput("from must be YYYY-MM-DD or RFC3339".to_string()))?;
        let to = parse_day(to)
            .ok_or_else(|| Error::InvalidInput("to must be YYYY-MM-DD or RFC3339".to_string()))?;

        Self::new(from, to)
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.from.and_time(NaiveTime::MIN).and_utc()
    }

    /// Exclusive upper bound of the window.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.to
            .succ_opt()
            .unwrap_or(self.to)
            .and_time(NaiveTime::MIN)
            .and_utc()
    }
}

fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|ts| ts.with_timezone(&Utc).date_naive())
    })
}

/// Optional narrowing of a summary report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryFilter {
    pub user_id: Option<UserId>,
    pub project_id: Option<ProjectId>,
}

/// One `(user, project)` group as produced by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryBucket {
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub user_is_active: bool,
    pub project_id: ProjectId,
    pub project_name: String,
    pub project_status: Option<String>,
    pub total_sessions: i64,
    pub total_seconds: i64,
}

/// Session count and time spent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_sessions: i64,
    pub total_seconds: i64,
    pub total_duration: String,
}

impl Totals {
    fn add(&mut self, sessions: i64, seconds: i64) {
        self.total_sessions += sessions;
        self.total_seconds += seconds;
        self.total_duration = format_duration(self.total_seconds);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project_id: ProjectId,
    pub project_name: String,
    pub status: Option<String>,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub is_active: bool,
    #[serde(flatten)]
    pub totals: Totals,
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub filters: SummaryFilter,
    pub overall: Totals,
    pub users: Vec<UserSummary>,
    pub projects: Vec<ProjectSummary>,
}

impl SummaryReport {
    /// Roll `(user, project)` groups up into overall, per-user and
    /// per-project totals.
    ///
    /// Users and projects are ordered by time spent, longest first, with the
    /// id as tie-breaker.
    #[must_use]
    pub fn from_buckets(range: SummaryRange, filters: SummaryFilter, buckets: Vec<SummaryBucket>) -> Self {
        let mut overall = Totals {
            total_duration: format_duration(0),
            ..Totals::default()
        };
        let mut users: BTreeMap<UserId, UserSummary> = BTreeMap::new();
        let mut projects: BTreeMap<ProjectId, ProjectSummary> = BTreeMap::new();

        for bucket in buckets {
            overall.add(bucket.total_sessions, bucket.total_seconds);

            let project_entry = || ProjectSummary {
                project_id: bucket.project_id,
                project_name: bucket.project_name.clone(),
                status: bucket.project_status.clone(),
                totals: Totals::default(),
            };

            projects
                .entry(bucket.project_id)
                .or_insert_with(&project_entry)
                .totals
                .add(bucket.total_sessions, bucket.total_seconds);

            let user = users.entry(bucket.user_id).or_insert_with(|| UserSummary {
                user_id: bucket.user_id,
                user_name: bucket.user_name.clone(),
                user_email: bucket.user_email.clone(),
                is_active: bucket.user_is_active,
                totals: Totals::default(),
                projects: Vec::new(),
            });
            user.totals.add(bucket.total_sessions, bucket.total_seconds);

            match user.projects.iter_mut().find(|p| p.project_id == bucket.project_id) {
                Some(existing) => existing.totals.add(bucket.total_sessions, bucket.total_seconds),
                None => {
                    let mut entry = project_entry();
                    entry.totals.add(bucket.total_sessions, bucket.total_seconds);
                    user.projects.push(entry);
                }
            }
        }

        let mut users: Vec<UserSummary> = users.into_values().collect();
        for user in &mut users {
            sort_projects(&mut user.projects);
        }
        users.sort_by(|a, b| {
            b.totals
                .total_seconds
                .cmp(&a.totals.total_seconds)
                .then(a.user_id.cmp(&b.user_id))
        });

        let mut projects: Vec<ProjectSummary> = projects.into_values().collect();
        sort_projects(&mut projects);

        Self {
            from: range.from,
            to: range.to,
            filters,
            overall,
            users,
            projects,
        }
    }
}

fn sort_projects(projects: &mut [ProjectSummary]) {
    projects.sort_by(|a, b| {
        b.totals
            .total_seconds
            .cmp(&a.totals.total_seconds)
            .then(a.project_id.cmp(&b.project_id))
    });
}

/// Render whole seconds as `"<d> days, HH:MM:SS"`.
///
/// # Examples
/// ```
/// use worktime_core::models::format_duration;
///
/// assert_eq!(format_duration(0), "0 days, 00:00:00");
/// assert_eq!(format_duration(90_061), "1 days, 01:01:01");
/// ```
#[must_use]
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    format!("{days} days, {hours:02}:{minutes:02}:{secs:02}")
}
