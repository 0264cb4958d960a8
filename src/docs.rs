use crate::api::attendance::{AttendanceListResponse, AttendanceQuery};
use crate::api::breaks::{BreakHistoryQuery, EndBreakRequest, StartBreakRequest};
use crate::api::reports::DailyReportQuery;
use crate::api::sync_ops::SyncFailureQuery;
use crate::model::attendance::{
    AttendanceDay, AttendanceStatus, BreakCompliance, BreakEntry, BreakState, RecordedBy,
};
use crate::model::employee::Employee;
use crate::model::facility::{Facility, SyncStatus};
use crate::model::shift::{BreakConfig, Shift};
use crate::model::sync_failure::SyncFailure;
use crate::report::aggregator::DayRow;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Sync API",
        version = "1.0.0",
        description = r#"
## Biometric Attendance Reconciliation Service

Ingests raw punch events from biometric attendance devices across
facilities and reconciles them into canonical per-employee-per-day
attendance records.

### 🔹 Key Features
- **Facility Sync**
  - Periodic device polling with per-facility isolation and sync status
- **Attendance Reconciliation**
  - Check-in/check-out/break classification with lateness, overtime and
    break-compliance metrics
- **Break Tracking**
  - Device-driven and employee self-service break clock in/out
- **Reporting**
  - Merged day view with absent synthesis and leave overlay

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::breaks::start_break,
        crate::api::breaks::end_break,
        crate::api::breaks::break_status,
        crate::api::breaks::break_history,

        crate::api::attendance::list_attendance,

        crate::api::reports::daily_report,

        crate::api::sync_ops::trigger_facility_sync,
        crate::api::sync_ops::sync_status,
        crate::api::sync_ops::sync_failures
    ),
    components(
        schemas(
            StartBreakRequest,
            EndBreakRequest,
            BreakHistoryQuery,
            AttendanceQuery,
            AttendanceListResponse,
            DailyReportQuery,
            SyncFailureQuery,
            DayRow,
            AttendanceDay,
            AttendanceStatus,
            BreakEntry,
            BreakState,
            BreakCompliance,
            RecordedBy,
            BreakConfig,
            Shift,
            Employee,
            Facility,
            SyncStatus,
            SyncFailure
        )
    ),
    tags(
        (name = "Breaks", description = "Employee break tracking APIs"),
        (name = "Attendance", description = "Merged attendance day-view APIs"),
        (name = "Reports", description = "Attendance reporting APIs"),
        (name = "Sync", description = "Facility device sync operations"),
    )
)]
pub struct ApiDoc;
