pub mod engine;
pub mod states;

pub use engine::{
    EditOperation, TransitionError, TripLifecycle, TwoTierApproval, WorkflowDefinition,
    WorkflowEngine,
};
pub use states::{Actor, ApprovalTier, SideEffect, TransitionOutcome, WorkflowCommand};
