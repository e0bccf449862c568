pub mod alarms;
pub mod files;
pub mod task_store;

pub use alarms::{AlarmFile, TimerFacility};
#[cfg(test)]
pub use alarms::MemoryAlarms;
pub use files::{
    alarms_file, config_file, ensure_data_dir, init_local_data_dir, tasks_file,
};
pub use task_store::{JsonTaskStore, TaskStore};
