use thiserror::Error;

/// Errors that drop a single device record. The batch keeps going.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record normalization failed: {0}")]
    Normalization(String),

    #[error("no employee matched (device_id={device_id:?}, card_id={card_id:?}, name={name:?})")]
    IdentityResolution {
        device_id: Option<String>,
        card_id: Option<String>,
        name: Option<String>,
    },

    #[error("employee {employee_id} has no shift assigned")]
    NoShiftAssigned { employee_id: u64 },

    #[error("shift {shift_id} has malformed start/end times")]
    BadShiftConfig { shift_id: u64 },

    #[error("version conflict on attendance day after {attempts} attempts")]
    ConcurrencyConflict { attempts: u32 },

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Errors that fail one facility's sync pass. Other facilities proceed.
#[derive(Debug, Error)]
pub enum FacilityError {
    #[error("device endpoint unavailable: {0}")]
    DeviceUnavailable(#[from] reqwest::Error),

    #[error("device call timed out after {0}s")]
    Timeout(u64),

    #[error("unexpected device response: {0}")]
    BadPayload(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Manual break API rejections. Returned to the caller as HTTP 400 with
/// the reason text; nothing is mutated.
#[derive(Debug, Error)]
pub enum BreakViolation {
    #[error("Break tracking is not enabled for this shift")]
    TrackingDisabled,

    #[error("No active attendance found. Please check in first.")]
    NotCheckedIn,

    #[error("Already checked out. Cannot start break.")]
    AlreadyCheckedOut,

    #[error("Already on {name} break since {since}")]
    AlreadyOnBreak { name: String, since: String },

    #[error("Break type '{0}' not configured for this shift")]
    UnknownBreakType(String),

    #[error("No active break found")]
    NoActiveBreak,
}
