use std::collections::HashMap;

/// What the buffer did with one classified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A partial snapshot was stored; nothing to emit yet.
    Buffered { created: bool },
    /// The task finished; this is the text to deliver.
    Emit(String),
    /// A partial with no task identifier can never be finalized.
    Dropped,
}

/// Latest partial content per task identifier.
///
/// Entries live from a task's first partial event until its final event.
/// Partials overwrite each other (last snapshot wins); nothing is appended.
#[derive(Debug, Default)]
pub struct TaskBuffer {
    entries: HashMap<String, String>,
}

impl TaskBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one classified event through the consolidation rules.
    pub fn observe(&mut self, task_id: Option<&str>, partial: bool, text: String) -> Step {
        match (task_id, partial) {
            (Some(id), true) => Step::Buffered {
                created: self.update(id, text),
            },
            (Some(id), false) => Step::Emit(self.finalize(id, text)),
            (None, true) => Step::Dropped,
            (None, false) => Step::Emit(text),
        }
    }

    /// Store a partial snapshot. Returns `true` when the task was not buffered before.
    pub fn update(&mut self, task_id: &str, content: String) -> bool {
        self.entries.insert(task_id.to_string(), content).is_none()
    }

    /// Close out a task. Buffered content is definitive when present;
    /// `own` (the final event's text) is used only for tasks that never
    /// produced a partial.
    pub fn finalize(&mut self, task_id: &str, own: String) -> String {
        self.entries.remove(task_id).unwrap_or(own)
    }

    #[cfg(test)]
    pub fn latest(&self, task_id: &str) -> Option<&str> {
        self.entries.get(task_id).map(String::as_str)
    }

    /// Drop every entry without emitting. Returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
