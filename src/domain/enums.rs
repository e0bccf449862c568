/// Half of a Pomodoro cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    /// The phase that follows this one
    pub fn next(self) -> Self {
        match self {
            Self::Work => Self::Break,
            Self::Break => Self::Work,
        }
    }

    /// Display label used in status lines
    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "Work Time",
            Self::Break => "Break Time",
        }
    }

    /// Notification category announcing that this phase has started
    pub fn started_category(self) -> Category {
        match self {
            Self::Work => Category::PhaseWorkStarted,
            Self::Break => Category::PhaseBreakStarted,
        }
    }
}

/// Whether the Pomodoro timer is counting down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Inactive,
    Running,
    Paused,
}

/// Semantic notification category; drives presentation policy and sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    TaskReminder,
    PhaseWorkStarted,
    PhaseBreakStarted,
}

impl Category {
    /// Stable tag used as the presentation id prefix
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::TaskReminder => "TASK_REMINDER",
            Self::PhaseWorkStarted => "POMODORO_WORK",
            Self::PhaseBreakStarted => "POMODORO_BREAK",
        }
    }

    /// Recover the category from a presentation id like "TASK_REMINDER_1700000000000_3"
    pub fn from_presentation_id(id: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|category| {
                id.strip_prefix(category.as_tag())
                    .is_some_and(|rest| rest.starts_with('_'))
            })
    }

    pub fn all() -> &'static [Category] {
        &[
            Category::TaskReminder,
            Category::PhaseWorkStarted,
            Category::PhaseBreakStarted,
        ]
    }
}

/// How insistently a notification is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    High,
}
