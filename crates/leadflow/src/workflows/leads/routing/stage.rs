use super::domain::LeadStage;

/// Rejection raised when a requested stage change is not legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionRejection {
    #[error("lead is in a terminal stage and can no longer change")]
    TerminalStage,
    #[error("requested stage is not reachable from the current stage")]
    InvalidTransition,
}

/// Pure validator for the lead lifecycle graph.
///
/// `new -> assigned -> contacted -> {won | lost}`, with `archived` reachable
/// from any open stage as an out-of-band withdrawal. Re-requesting the
/// current stage is accepted as a no-op. All mutation happens in the routing
/// service after a successful validation.
pub struct LeadStageMachine;

impl LeadStageMachine {
    pub fn validate_transition(
        current: LeadStage,
        requested: LeadStage,
    ) -> Result<LeadStage, TransitionRejection> {
        if current.is_terminal() {
            return Err(TransitionRejection::TerminalStage);
        }

        if requested == current {
            return Ok(current);
        }

        if current.successors().contains(&requested) {
            Ok(requested)
        } else {
            Err(TransitionRejection::InvalidTransition)
        }
    }
}
