pub mod enums;
pub mod task;

pub use enums::{Activity, Category, Phase, Urgency};
pub use task::{next_task_id, reminder_agenda, Task};
