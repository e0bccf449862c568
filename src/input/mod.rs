pub mod handler;

pub use handler::{parse_line, parse_task_id, parse_when, Line, HELP};
