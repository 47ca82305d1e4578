use serde::{Deserialize, Serialize};

/// The finite sum type of spec.md §9: a per-id "last committed event" tag.
/// Kept as a tagged enum rather than a tuple of strings, per the teacher's
/// preference (see `tracking::motion_model_2d` for the analogous pattern
/// of small, closed state enums over stringly-typed state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    EnterStrong,
    EnterWeak,
    ExitStrong,
    ExitWeak,
}

impl Direction {
    /// The event *name* (`enter` vs `exit`), ignoring strong/weak type.
    pub fn name(self) -> EventName {
        match self {
            Direction::EnterStrong | Direction::EnterWeak => EventName::Enter,
            Direction::ExitStrong | Direction::ExitWeak => EventName::Exit,
        }
    }

    pub fn is_weak(self) -> bool {
        matches!(self, Direction::EnterWeak | Direction::ExitWeak)
    }

    pub fn is_strong(self) -> bool {
        !self.is_weak()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventName {
    Enter,
    Exit,
}

impl EventName {
    pub fn opposite(self) -> EventName {
        match self {
            EventName::Enter => EventName::Exit,
            EventName::Exit => EventName::Enter,
        }
    }

    pub fn strong(self) -> Direction {
        match self {
            EventName::Enter => Direction::EnterStrong,
            EventName::Exit => Direction::ExitStrong,
        }
    }

    pub fn weak(self) -> Direction {
        match self {
            EventName::Enter => Direction::EnterWeak,
            EventName::Exit => Direction::ExitWeak,
        }
    }
}

/// `last(id)` of spec.md §4.5: `None` until a first event commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionState {
    pub tag: Direction,
    pub frame: u64,
}
