//! Crash-safe, validated editing of a single protected file.
//!
//! An editing [`Session`] reserves a well-known staging slot, copies the
//! target into it, hands it to the operator's editor, and validates the
//! result. Invalid content sends the operator back to the editor (at the
//! offending line when it is known), lets them discard the edit, or lets
//! them force it through. Valid content gets its final owner, group and
//! mode and is then renamed over the target in one atomic step.
//!
//! ## Crash safety
//!
//! The target is touched exactly once, by the final rename. Until then
//! every failure, including fatal signals trapped by the [`SignalGuard`],
//! removes the staged file and leaves the target byte-identical. The
//! staging slot doubles as the lock: it is created exclusively, so a second
//! session sees [`SessionError::Busy`] and leaves everything alone.

mod commit;
mod editor;
mod error;
mod identity;
mod prompt;
mod report;
mod session;
mod signals;
mod slot;
mod subprocess;
mod validator;
mod working_copy;

#[cfg(any(test, feature = "test-support"))]
pub mod test_doubles;

pub use commit::{CommitError, CommitMethod, FinalAttributes, commit, finalize};
pub use editor::{Editor, EditorError, ProcessEditor};
pub use error::SessionError;
pub use identity::{IdentityError, InvokingUser};
pub use prompt::{Choice, Operator, Prompt};
pub use report::{SessionReporter, StructuredSessionReporter};
pub use session::{Session, SessionOutcome, SessionSettings, SessionState};
pub use signals::{
    DEFERRED_SIGNALS, FATAL_SIGNALS, SignalError, SignalGuard, restore_child_dispositions,
};
pub use slot::{SlotError, SlotHandle, StagingSlot};
pub use validator::{
    AcceptingValidator, CommandValidator, ValidationOutcome, ValidationReport, Validator,
    ValidatorError, locate_error_line,
};
pub use working_copy::WorkingCopy;

#[cfg(test)]
mod tests;
