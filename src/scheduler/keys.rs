use crate::error::ScheduleKeyError;

/// Prefix shared by every task reminder alarm key
pub const TASK_REMINDER_PREFIX: &str = "TASK_REMINDER_";

/// Alarm key for a task's reminder
pub fn reminder_key(task_id: i64) -> String {
    format!("{}{}", TASK_REMINDER_PREFIX, task_id)
}

/// Recover the task id from a fired alarm key.
///
/// Only the exact form produced by [`reminder_key`] is accepted, so
/// `TASK_REMINDER_07` or `TASK_REMINDER_+7` never alias task 7.
pub fn parse_reminder_key(key: &str) -> Result<i64, ScheduleKeyError> {
    let digits = key
        .strip_prefix(TASK_REMINDER_PREFIX)
        .ok_or_else(|| ScheduleKeyError::MissingPrefix(key.to_string()))?;

    let task_id: i64 = digits
        .parse()
        .map_err(|_| ScheduleKeyError::BadTaskId(key.to_string()))?;

    if task_id.to_string() != digits {
        return Err(ScheduleKeyError::BadTaskId(key.to_string()));
    }
    Ok(task_id)
}
