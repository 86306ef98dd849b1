//! The [`Log`] sink and the per-task records behind the run summary.

/// How a task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskStatus {
    /// Ran to completion; a tracked step is now marked.
    Done,
    /// The step marker was already present, so the task did not run.
    AlreadyDone,
    /// Nothing declared for this host, or the platform lacks the feature.
    NotApplicable,
    /// Could not run (a required tool is missing); the step stays unmarked.
    Skipped,
    /// Only reported what it would change.
    DryRun,
    /// Ended in an error; the step stays unmarked.
    Failed,
}

impl TaskStatus {
    /// Every status, in summary order.
    pub const ALL: [Self; 6] = [
        Self::Done,
        Self::AlreadyDone,
        Self::NotApplicable,
        Self::Skipped,
        Self::DryRun,
        Self::Failed,
    ];

    /// Glyph leading the task's summary line.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Done => "✓",
            Self::AlreadyDone => "=",
            Self::NotApplicable => "·",
            Self::Skipped => "○",
            Self::DryRun => "~",
            Self::Failed => "✗",
        }
    }

    /// Word used for this status in the totals line.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::AlreadyDone => "already done",
            Self::NotApplicable => "n/a",
            Self::Skipped => "skipped",
            Self::DryRun => "dry-run",
            Self::Failed => "failed",
        }
    }

    /// SGR colour code for the console.
    pub(super) const fn colour(self) -> &'static str {
        match self {
            Self::Done => "32",
            Self::AlreadyDone | Self::NotApplicable => "2",
            Self::Skipped => "33",
            Self::DryRun => "36",
            Self::Failed => "31",
        }
    }
}

/// One task in the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Task name.
    pub name: String,
    /// `<host>-<id>` marker tracking the task, if any.
    pub step: Option<String>,
    /// How the task ended.
    pub status: TaskStatus,
    /// Skip reason or error text.
    pub message: Option<String>,
}

impl TaskEntry {
    /// Entry for task `name` with no step or message.
    #[must_use]
    pub fn new(name: &str, status: TaskStatus) -> Self {
        Self {
            name: name.to_string(),
            step: None,
            status,
            message: None,
        }
    }

    /// Attach the step marker name.
    #[must_use]
    pub fn with_step(mut self, step: Option<&str>) -> Self {
        self.step = step.map(str::to_string);
        self
    }

    /// Attach a reason or error text.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// `name [step] (message)` with the optional parts left out when absent.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = self.name.clone();
        if let Some(step) = &self.step {
            out.push_str(" [");
            out.push_str(step);
            out.push(']');
        }
        if let Some(message) = &self.message {
            out.push_str(" (");
            out.push_str(message);
            out.push(')');
        }
        out
    }
}

/// Where tasks, resources and commands send their messages.
///
/// [`Logger`](super::Logger) forwards to `tracing`; tests use an in-memory
/// recorder.
pub trait Log: Send + Sync {
    /// Section header (`==>`).
    fn stage(&self, msg: &str);
    /// Progress line.
    fn info(&self, msg: &str);
    /// Detail shown with `--verbose` and always written to the log file.
    fn debug(&self, msg: &str);
    /// Something the user should look at.
    fn warn(&self, msg: &str);
    /// A failure.
    fn error(&self, msg: &str);
    /// A change that dry-run mode did not make.
    fn dry_run(&self, msg: &str);
    /// Remember how a task ended, for the summary.
    fn record_task(&self, entry: TaskEntry);
}
