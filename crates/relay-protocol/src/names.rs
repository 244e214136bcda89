// Well-known discriminators (must match what the worker extension emits).

// frame types
pub const FRAME_EVENT: &str = "event";

// worker event names
pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_TASK_CREATED: &str = "taskCreated";

// message categories (`say`)
pub const SAY_COMPLETION_RESULT: &str = "completion_result";

// interactive prompts (`ask`)
pub const ASK_FOLLOWUP: &str = "followup";
