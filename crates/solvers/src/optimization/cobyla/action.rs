/// Actions an observer can take during a COBYLA run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the solver and return the best vertex found so far.
    ///
    /// Ignored when returned for [`Event::Finished`](super::Event::Finished).
    StopEarly,
}
