//! Shift model and related types.
//!
//! A [`Shift`] is one work period for one employee. It is mutated through
//! punches and breaks while in progress and becomes immutable input to the
//! calculation engine once completed.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::AuditRecord;

/// The kind of break taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakType {
    /// A meal break.
    Meal,
    /// A short rest break.
    Rest,
    /// Any other gap (e.g. the gap in a split shift).
    #[default]
    Other,
}

/// Represents a break taken during a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Break {
    /// The start time of the break.
    pub start_time: NaiveDateTime,
    /// The end time of the break.
    pub end_time: NaiveDateTime,
    /// Whether the break is paid (true) or unpaid (false).
    pub is_paid: bool,
    /// The kind of break.
    #[serde(default)]
    pub break_type: BreakType,
}

impl Break {
    /// Returns the duration of the break in minutes (never negative).
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes().max(0)
    }
}

/// Scheduling classification of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftClassification {
    /// Ordinary day shift.
    #[default]
    Day,
    /// Night shift.
    Night,
    /// Rostered weekend shift.
    Weekend,
    /// Standby: available but not working.
    Standby,
    /// Called out while on call.
    OnCall,
}

/// How the shift's times were captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    /// Physical or web time clock.
    #[default]
    TimeClock,
    /// Mobile app punch.
    Mobile,
    /// Imported from a roster.
    RosterImport,
    /// Entered manually by a supervisor.
    Manual,
}

/// Lifecycle status of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    /// Rostered, not started.
    Scheduled,
    /// Clocked in.
    InProgress,
    /// Clocked out; ready for calculation.
    Completed,
    /// Approved by a supervisor.
    Approved,
    /// Rejected by a supervisor.
    Rejected,
    /// Exported to payroll.
    Processed,
}

impl ShiftStatus {
    fn can_transition_to(self, next: ShiftStatus) -> bool {
        use ShiftStatus::*;
        matches!(
            (self, next),
            (Scheduled, InProgress)
                | (Scheduled, Completed)
                | (InProgress, Completed)
                | (Completed, Approved)
                | (Completed, Rejected)
                | (Approved, Processed)
        )
    }
}

/// Represents a work shift with timing information and breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    /// Unique identifier for the shift.
    pub id: String,
    /// The employee who worked the shift.
    pub employee_id: String,
    /// The employing organization.
    pub organization_id: String,
    /// Work location.
    #[serde(default)]
    pub location_id: Option<String>,
    /// Cost centre the hours are charged to.
    pub cost_center: String,
    /// Project the hours are charged to, if any.
    #[serde(default)]
    pub project: Option<String>,
    /// Rostered start.
    #[serde(default)]
    pub scheduled_start: Option<NaiveDateTime>,
    /// Rostered end.
    #[serde(default)]
    pub scheduled_end: Option<NaiveDateTime>,
    /// Clock-in time.
    pub actual_start: NaiveDateTime,
    /// Clock-out time; `None` while the shift is in progress.
    #[serde(default)]
    pub actual_end: Option<NaiveDateTime>,
    /// Breaks taken during the shift.
    #[serde(default)]
    pub breaks: Vec<Break>,
    /// Scheduling classification.
    #[serde(default)]
    pub classification: ShiftClassification,
    /// How the times were captured.
    #[serde(default)]
    pub capture_source: CaptureSource,
    /// Lifecycle status.
    pub status: ShiftStatus,
    /// Overtime hours recorded once the shift has been processed.
    #[serde(default)]
    pub overtime_hours: Option<Decimal>,
    /// Overtime amount recorded once the shift has been processed.
    #[serde(default)]
    pub overtime_amount: Option<Decimal>,
    /// Record metadata.
    #[serde(default)]
    pub audit: AuditRecord,
}

impl Shift {
    /// The calendar date the shift is attributed to (its start date).
    pub fn work_date(&self) -> NaiveDate {
        self.actual_start.date()
    }

    /// Returns the day of the week the shift started on.
    ///
    /// # Examples
    ///
    /// ```
    /// use overtime_engine::models::{Shift, ShiftStatus};
    /// use chrono::{NaiveDateTime, Weekday};
    ///
    /// let start = NaiveDateTime::parse_from_str("2026-03-07 22:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
    /// let shift = Shift::completed("shift_001", "emp_001", start, start + chrono::Duration::hours(8));
    /// assert_eq!(shift.day_of_week(), Weekday::Sat);
    /// assert_eq!(shift.status, ShiftStatus::Completed);
    /// ```
    pub fn day_of_week(&self) -> Weekday {
        self.work_date().weekday()
    }

    /// Convenience constructor for a completed shift with no breaks.
    pub fn completed(
        id: impl Into<String>,
        employee_id: impl Into<String>,
        actual_start: NaiveDateTime,
        actual_end: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            employee_id: employee_id.into(),
            organization_id: "default".to_string(),
            location_id: None,
            cost_center: "GENERAL".to_string(),
            project: None,
            scheduled_start: Some(actual_start),
            scheduled_end: Some(actual_end),
            actual_start,
            actual_end: Some(actual_end),
            breaks: Vec::new(),
            classification: ShiftClassification::Day,
            capture_source: CaptureSource::TimeClock,
            status: ShiftStatus::Completed,
            overtime_hours: None,
            overtime_amount: None,
            audit: AuditRecord::default(),
        }
    }

    /// Returns true once the shift has a clock-out and has left the in-progress states.
    pub fn is_completed(&self) -> bool {
        self.actual_end.is_some()
            && !matches!(
                self.status,
                ShiftStatus::Scheduled | ShiftStatus::InProgress
            )
    }

    /// Minutes between clock-in and clock-out, if clocked out.
    pub fn gross_minutes(&self) -> Option<i64> {
        self.actual_end
            .map(|end| (end - self.actual_start).num_minutes())
    }

    /// Total minutes of unpaid breaks.
    pub fn unpaid_break_minutes(&self) -> i64 {
        self.breaks
            .iter()
            .filter(|b| !b.is_paid)
            .map(Break::duration_minutes)
            .sum()
    }

    /// Gross minutes minus unpaid breaks. May be negative for bad data.
    pub fn net_minutes(&self) -> Option<i64> {
        self.gross_minutes()
            .map(|gross| gross - self.unpaid_break_minutes())
    }

    /// Elapsed hours between clock-in and clock-out, breaks included.
    pub fn elapsed_hours(&self) -> Option<Decimal> {
        self.gross_minutes()
            .map(|m| Decimal::from(m.max(0)) / Decimal::from(60))
    }

    /// Worked intervals: the shift span with unpaid breaks cut out.
    pub fn worked_intervals(&self) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        let Some(end) = self.actual_end else {
            return Vec::new();
        };
        if end <= self.actual_start {
            return Vec::new();
        }

        let mut unpaid: Vec<&Break> = self.breaks.iter().filter(|b| !b.is_paid).collect();
        unpaid.sort_by_key(|b| b.start_time);

        let mut intervals = Vec::new();
        let mut cursor = self.actual_start;
        for b in unpaid {
            let break_start = b.start_time.clamp(self.actual_start, end);
            let break_end = b.end_time.clamp(self.actual_start, end);
            if break_start > cursor {
                intervals.push((cursor, break_start));
            }
            cursor = cursor.max(break_end);
        }
        if cursor < end {
            intervals.push((cursor, end));
        }
        intervals
    }

    /// Length of the longest unpaid gap, in minutes.
    pub fn longest_unpaid_gap_minutes(&self) -> i64 {
        self.breaks
            .iter()
            .filter(|b| !b.is_paid)
            .map(Break::duration_minutes)
            .max()
            .unwrap_or(0)
    }

    /// Returns true if a break of `break_type` lasting at least `minimum_minutes` was taken.
    pub fn has_qualifying_break(&self, break_type: BreakType, minimum_minutes: i64) -> bool {
        self.breaks
            .iter()
            .any(|b| b.break_type == break_type && b.duration_minutes() >= minimum_minutes)
    }

    /// Moves the shift to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: ShiftStatus, actor: &str) -> EngineResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(EngineError::CalculationError {
                message: format!(
                    "shift '{}' cannot move from {:?} to {:?}",
                    self.id, self.status, next
                ),
                partial_trace: Vec::new(),
            });
        }
        if next == ShiftStatus::Completed && self.actual_end.is_none() {
            return Err(EngineError::InvalidTimeRange {
                shift_id: self.id.clone(),
                message: "cannot complete a shift without a clock-out".to_string(),
            });
        }
        self.status = next;
        self.audit.touch(actor);
        Ok(())
    }

    /// Records the clock-out and completes the shift.
    pub fn clock_out(&mut self, at: NaiveDateTime, actor: &str) -> EngineResult<()> {
        if at < self.actual_start {
            return Err(EngineError::InvalidTimeRange {
                shift_id: self.id.clone(),
                message: format!("clock-out {} precedes clock-in {}", at, self.actual_start),
            });
        }
        self.actual_end = Some(at);
        self.transition(ShiftStatus::Completed, actor)
    }
}
