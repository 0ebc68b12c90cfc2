use crate::tasks::TaskId;

/// Observer of headless task transitions.
///
/// Called on the UI queue. Listeners only receive ids; the task itself stays
/// in the registry. Adding or removing listeners from inside a callback is allowed.
pub trait HeadlessTaskEventListener: Send + Sync + 'static {
    /// A task was registered.
    fn on_headless_task_start(&self, id: TaskId);

    /// A task finished, explicitly or by timeout.
    fn on_headless_task_finish(&self, id: TaskId);
}
