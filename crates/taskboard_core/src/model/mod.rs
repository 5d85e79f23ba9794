mod task;

pub use task::{StatusTransition, Task, TaskId, TaskStatus};
