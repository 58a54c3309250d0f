/// State machine contract for entities with a constrained lifecycle.
///
/// Implementations enumerate which transitions are legal; callers validate a
/// transition before persisting it so that illegal writes never reach storage.
pub trait LifecycleState: Clone + std::fmt::Debug + PartialEq {
    /// Terminal states admit no further transitions.
    fn is_terminal(&self) -> bool;

    /// Whether a transition from `self` to `next` is legal.
    fn can_transition_to(&self, next: &Self) -> bool;
}
