use std::fmt::Debug;

/// Condition polled to decide whether a transition fires.
pub type TransitionCondition<C> = Box<dyn Fn(&C) -> bool + Send>;

/// An edge in the behavior transition table.
pub struct Transition<S, C> {
    from: S,
    to: S,
    priority: i32,
    condition: TransitionCondition<C>,
}

impl<S: Copy, C> Transition<S, C> {
    pub fn from_state(&self) -> S {
        self.from
    }

    pub fn to_state(&self) -> S {
        self.to
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

/// Message emitted when the machine changes state. The caller runs any
/// exit/enter work for the two states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChange<S> {
    pub from: S,
    pub to: S,
}

/// Polling state machine for entity behavior.
///
/// States are plain values (usually a fieldless enum). On every
/// [`update`](Self::update) the transitions leaving the current state are
/// checked from highest to lowest priority; the first one whose condition
/// holds fires. Transitions of equal priority are checked in the order they
/// were added.
///
/// # Example
///
/// ```rust
/// use pathforge::behavior::{BehaviorMachine, StateChange};
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// enum Guard { Idle, Chase }
///
/// struct Senses { enemy_visible: bool }
///
/// let mut machine = BehaviorMachine::new(Guard::Idle);
/// machine.add_transition(Guard::Idle, Guard::Chase, 0, |s: &Senses| s.enemy_visible);
/// machine.add_transition(Guard::Chase, Guard::Idle, 0, |s: &Senses| !s.enemy_visible);
///
/// assert_eq!(machine.update(&Senses { enemy_visible: false }), None);
/// assert_eq!(
///     machine.update(&Senses { enemy_visible: true }),
///     Some(StateChange { from: Guard::Idle, to: Guard::Chase })
/// );
/// ```
pub struct BehaviorMachine<S, C> {
    current: S,
    transitions: Vec<Transition<S, C>>,
    pending: Option<S>,
}

impl<S, C> BehaviorMachine<S, C>
where
    S: Copy + PartialEq + Debug,
{
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            transitions: Vec::new(),
            pending: None,
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    /// Add a transition. Higher priorities are checked first.
    pub fn add_transition<F>(&mut self, from: S, to: S, priority: i32, condition: F) -> &mut Self
    where
        F: Fn(&C) -> bool + Send + 'static,
    {
        // keep sorted by descending priority, stable for equal priorities
        let at = self
            .transitions
            .iter()
            .position(|t| t.priority < priority)
            .unwrap_or(self.transitions.len());
        self.transitions.insert(
            at,
            Transition {
                from,
                to,
                priority,
                condition: Box::new(condition),
            },
        );
        self
    }

    /// Transitions leaving `state`, in evaluation order.
    pub fn transitions_from(&self, state: S) -> impl Iterator<Item = &Transition<S, C>> {
        self.transitions.iter().filter(move |t| t.from == state)
    }

    /// Queue a forced change to `state`, applied on the next update ahead of
    /// any transition.
    pub fn request(&mut self, state: S) {
        self.pending = Some(state);
    }

    /// Poll the transition table once. Returns the change made, if any.
    pub fn update(&mut self, ctx: &C) -> Option<StateChange<S>> {
        let next = match self.pending.take() {
            Some(requested) => requested,
            None => self
                .transitions
                .iter()
                .find(|t| t.from == self.current && (t.condition)(ctx))
                .map(|t| t.to)?,
        };

        if next == self.current {
            return None;
        }

        let change = StateChange {
            from: self.current,
            to: next,
        };
        log::debug!("behavior {:?} -> {:?}", change.from, change.to);
        self.current = next;
        Some(change)
    }
}
