//! Pipeline lifecycle states and transitions.

/// Lifecycle state of a pipeline (and of every element in it).
///
/// Transitions only happen between adjacent states, in either direction:
/// `Null ↔ Ready ↔ Paused ↔ Playing`. A request to a non-adjacent state is
/// walked one step at a time, never skipping intermediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum State {
    /// Initial state: no resources allocated.
    #[default]
    Null = 0,
    /// Resources allocated, not yet processing.
    Ready = 1,
    /// Prerolled and stopped; also the stable state the controller
    /// returns to on error before full teardown.
    Paused = 2,
    /// Actively processing data.
    Playing = 3,
}

impl State {
    /// The next state upward, if any.
    pub fn up(self) -> Option<State> {
        match self {
            Self::Null => Some(Self::Ready),
            Self::Ready => Some(Self::Paused),
            Self::Paused => Some(Self::Playing),
            Self::Playing => None,
        }
    }

    /// The next state downward, if any.
    pub fn down(self) -> Option<State> {
        match self {
            Self::Null => None,
            Self::Ready => Some(Self::Null),
            Self::Paused => Some(Self::Ready),
            Self::Playing => Some(Self::Paused),
        }
    }

    /// The adjacent state one step toward `target`.
    ///
    /// Returns `self` when already at the target.
    pub fn step_toward(self, target: State) -> State {
        match self.cmp(&target) {
            std::cmp::Ordering::Less => self.up().unwrap_or(self),
            std::cmp::Ordering::Greater => self.down().unwrap_or(self),
            std::cmp::Ordering::Equal => self,
        }
    }

    /// Human-readable state name, matching the engine's naming.
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Ready => "READY",
            Self::Paused => "PAUSED",
            Self::Playing => "PLAYING",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single adjacent state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// NULL → READY.
    NullToReady,
    /// READY → PAUSED (preroll).
    ReadyToPaused,
    /// PAUSED → PLAYING.
    PausedToPlaying,
    /// PLAYING → PAUSED.
    PlayingToPaused,
    /// PAUSED → READY.
    PausedToReady,
    /// READY → NULL (release resources).
    ReadyToNull,
}

impl Transition {
    /// Build a transition between two adjacent states.
    ///
    /// Returns `None` for non-adjacent pairs or `from == to`.
    pub fn new(from: State, to: State) -> Option<Transition> {
        match (from, to) {
            (State::Null, State::Ready) => Some(Self::NullToReady),
            (State::Ready, State::Paused) => Some(Self::ReadyToPaused),
            (State::Paused, State::Playing) => Some(Self::PausedToPlaying),
            (State::Playing, State::Paused) => Some(Self::PlayingToPaused),
            (State::Paused, State::Ready) => Some(Self::PausedToReady),
            (State::Ready, State::Null) => Some(Self::ReadyToNull),
            _ => None,
        }
    }

    /// The state this transition starts from.
    pub fn from(self) -> State {
        match self {
            Self::NullToReady => State::Null,
            Self::ReadyToPaused => State::Ready,
            Self::PausedToPlaying => State::Paused,
            Self::PlayingToPaused => State::Playing,
            Self::PausedToReady => State::Paused,
            Self::ReadyToNull => State::Ready,
        }
    }

    /// The state this transition ends at.
    pub fn to(self) -> State {
        match self {
            Self::NullToReady => State::Ready,
            Self::ReadyToPaused => State::Paused,
            Self::PausedToPlaying => State::Playing,
            Self::PlayingToPaused => State::Paused,
            Self::PausedToReady => State::Ready,
            Self::ReadyToNull => State::Null,
        }
    }

    /// Whether this transition moves toward PLAYING.
    pub fn is_upward(self) -> bool {
        self.to() > self.from()
    }
}

/// Result of a state change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateChangeResult {
    /// The transition completed.
    Success,
    /// The transition is in progress; completion is signaled later via a
    /// `StateChanged` message on the bus.
    Async,
    /// The transition completed but the element cannot preroll
    /// (live sources reaching PAUSED).
    NoPreroll,
    /// The transition failed.
    Failure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacency() {
        assert_eq!(State::Null.up(), Some(State::Ready));
        assert_eq!(State::Playing.up(), None);
        assert_eq!(State::Playing.down(), Some(State::Paused));
        assert_eq!(State::Null.down(), None);
    }

    #[test]
    fn test_step_toward() {
        assert_eq!(State::Null.step_toward(State::Playing), State::Ready);
        assert_eq!(State::Playing.step_toward(State::Null), State::Paused);
        assert_eq!(State::Paused.step_toward(State::Paused), State::Paused);
    }

    #[test]
    fn test_transition_only_adjacent() {
        assert_eq!(
            Transition::new(State::Null, State::Ready),
            Some(Transition::NullToReady)
        );
        assert_eq!(Transition::new(State::Null, State::Paused), None);
        assert_eq!(Transition::new(State::Ready, State::Ready), None);
    }

    #[test]
    fn test_transition_direction() {
        assert!(Transition::ReadyToPaused.is_upward());
        assert!(!Transition::PausedToReady.is_upward());
        assert_eq!(Transition::PausedToPlaying.from(), State::Paused);
        assert_eq!(Transition::PausedToPlaying.to(), State::Playing);
    }
}
