use bon::Builder;

/// Information about the task a sink instance runs in
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    /// Name of the component in the pipeline topology
    #[builder(into)]
    component: String,
    /// Index of this task among all tasks of the component
    #[builder(default)]
    task_index: usize,
}

impl TaskContext {
    /// Name of the component in the pipeline topology
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Index of this task among all tasks of the component
    pub fn task_index(&self) -> usize {
        self.task_index
    }
}
