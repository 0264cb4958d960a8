use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Late,
    HalfDay,
    Absent,
    OnLeave,
    Excused,
}

impl AttendanceStatus {
    /// Ordering used by the tighten-only status rule. `Absent` is the
    /// unresolved default and is not ranked.
    pub fn severity(self) -> u8 {
        match self {
            AttendanceStatus::Absent => 0,
            AttendanceStatus::Present => 1,
            AttendanceStatus::Excused => 2,
            AttendanceStatus::OnLeave => 3,
            AttendanceStatus::HalfDay => 4,
            AttendanceStatus::Late => 5,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BreakState {
    Ongoing,
    Completed,
    Exceeded,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordedBy {
    Device,
    Employee,
    Manual,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BreakCompliance {
    Compliant,
    Exceeded,
    Insufficient,
    None,
}

/// One break taken within a day, stored in the `breaks` JSON column.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BreakEntry {
    #[serde(rename = "type")]
    #[schema(example = "lunch")]
    pub break_type: String,

    #[schema(example = "Lunch Break")]
    pub name: String,

    /// Facility-local wall clock.
    pub start_time: NaiveDateTime,

    pub end_time: Option<NaiveDateTime>,

    /// Minutes, rounded; 0 while ongoing.
    #[schema(example = 50)]
    pub duration: i64,

    pub status: BreakState,

    pub recorded_by: RecordedBy,
}

/// The per-(employee, date) attendance aggregate. All wall-clock fields
/// are naive datetimes in the owning facility's timezone.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceDay {
    pub id: u64,
    pub employee_id: u64,
    pub facility_id: u64,
    pub shift_id: u64,

    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub date: NaiveDate,

    pub scheduled_check_in: NaiveDateTime,
    pub scheduled_check_out: NaiveDateTime,

    pub check_in_time: Option<NaiveDateTime>,
    pub check_in_method: Option<String>,
    pub check_in_device_id: Option<String>,

    pub check_out_time: Option<NaiveDateTime>,
    pub check_out_method: Option<String>,
    pub check_out_device_id: Option<String>,

    pub status: AttendanceStatus,

    #[schema(example = 8.25)]
    pub work_hours: f64,
    #[schema(example = 7.25)]
    pub net_work_hours: f64,
    pub overtime: f64,
    pub undertime: f64,

    /// Minutes past the grace threshold.
    pub late_arrival: i32,
    /// Minutes before the early-arrival threshold.
    pub early_arrival: i32,
    /// Minutes left before the early-departure threshold.
    pub early_departure: i32,

    #[schema(value_type = Vec<BreakEntry>)]
    pub breaks: Json<Vec<BreakEntry>>,

    /// Minutes across completed and exceeded breaks.
    pub total_break_time: i32,

    pub break_compliance: BreakCompliance,

    /// Append-only log of the raw device payloads that touched this day.
    #[schema(value_type = Vec<Object>)]
    pub raw_audit: Json<Vec<serde_json::Value>>,

    /// Optimistic-concurrency version, bumped on every write.
    pub version: u64,
}

impl AttendanceDay {
    pub fn has_check_in(&self) -> bool {
        self.check_in_time.is_some()
    }

    pub fn has_check_out(&self) -> bool {
        self.check_out_time.is_some()
    }

    pub fn ongoing_break(&self) -> Option<&BreakEntry> {
        self.breaks.iter().find(|b| b.status == BreakState::Ongoing)
    }

    pub fn ongoing_break_mut(&mut self) -> Option<&mut BreakEntry> {
        self.breaks
            .iter_mut()
            .find(|b| b.status == BreakState::Ongoing)
    }

    /// Status only ever tightens toward a worse classification within a
    /// day; `Absent` is the unresolved default and yields to anything.
    pub fn tighten_status(&mut self, next: AttendanceStatus) {
        if self.status == AttendanceStatus::Absent
            || next.severity() > self.status.severity()
        {
            self.status = next;
        }
    }

    /// totalBreakTime invariant: sum over completed and exceeded breaks.
    pub fn recompute_break_total(&mut self) {
        self.total_break_time = self
            .breaks
            .iter()
            .filter(|b| matches!(b.status, BreakState::Completed | BreakState::Exceeded))
            .map(|b| b.duration)
            .sum::<i64>() as i32;
    }
}
