//! Shared state machine for write-triggered flows (create poll, vote,
//! claim reward).
//!
//! `Idle → Submitting → AwaitingConfirmation → Confirmed`, with any step
//! allowed to fail into `Failed`. Terminal states return to `Idle` through
//! `reset`; the timed auto-close after a confirmation belongs to the caller.

use crate::chain::TxId;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum FlowState {
    Idle,
    Submitting,
    AwaitingConfirmation { tx: TxId },
    Confirmed { tx: TxId },
    Failed { message: String },
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Submitting => "submitting",
            FlowState::AwaitingConfirmation { .. } => "awaiting-confirmation",
            FlowState::Confirmed { .. } => "confirmed",
            FlowState::Failed { .. } => "failed",
        }
    }
}

pub struct WriteFlow {
    op: &'static str,
    state: FlowState,
}

impl WriteFlow {
    pub fn new(op: &'static str) -> Self {
        WriteFlow {
            op,
            state: FlowState::Idle,
        }
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn tx(&self) -> Option<&TxId> {
        match &self.state {
            FlowState::AwaitingConfirmation { tx } | FlowState::Confirmed { tx } => Some(tx),
            _ => None,
        }
    }

    fn transition(&mut self, expected: &'static str, next: FlowState) -> Result<()> {
        if self.state.name() != expected {
            return Err(Error::FlowTransition {
                op: self.op,
                from: self.state.name(),
                to: next.name(),
            });
        }
        log::debug!("{} flow: {} -> {}", self.op, self.state.name(), next.name());
        self.state = next;
        Ok(())
    }

    pub fn submitting(&mut self) -> Result<()> {
        self.transition("idle", FlowState::Submitting)
    }

    pub fn awaiting(&mut self, tx: TxId) -> Result<()> {
        self.transition("submitting", FlowState::AwaitingConfirmation { tx })
    }

    pub fn confirmed(&mut self) -> Result<()> {
        let tx = match &self.state {
            FlowState::AwaitingConfirmation { tx } => tx.clone(),
            _ => {
                return Err(Error::FlowTransition {
                    op: self.op,
                    from: self.state.name(),
                    to: "confirmed",
                })
            }
        };
        log::debug!("{} flow: awaiting-confirmation -> confirmed", self.op);
        self.state = FlowState::Confirmed { tx };
        Ok(())
    }

    /// Failure is reachable from every state.
    pub fn failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{} flow failed: {}", self.op, message);
        self.state = FlowState::Failed { message };
    }

    pub fn reset(&mut self) {
        self.state = FlowState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut flow = WriteFlow::new("vote");
        assert_eq!(flow.state(), &FlowState::Idle);
        flow.submitting().unwrap();
        flow.awaiting(TxId::new("0x1")).unwrap();
        assert_eq!(flow.tx(), Some(&TxId::new("0x1")));
        flow.confirmed().unwrap();
        assert_eq!(flow.state().name(), "confirmed");
        assert_eq!(flow.tx(), Some(&TxId::new("0x1")));
        flow.reset();
        assert_eq!(flow.state(), &FlowState::Idle);
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let mut flow = WriteFlow::new("create-poll");
        assert!(flow.confirmed().is_err());
        assert!(flow.awaiting(TxId::new("0x1")).is_err());
        flow.submitting().unwrap();
        assert!(flow.submitting().is_err());
    }

    #[test]
    fn failure_from_any_state_then_reset() {
        let mut flow = WriteFlow::new("claim-reward");
        flow.submitting().unwrap();
        flow.failed("user rejected the request");
        assert_eq!(
            flow.state(),
            &FlowState::Failed {
                message: "user rejected the request".to_string()
            }
        );
        assert_eq!(flow.tx(), None);
        flow.reset();
        flow.submitting().unwrap();
    }
}
