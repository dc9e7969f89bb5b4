//! git
//!
//! Local git state: subprocess execution, clone reconciliation, clone URL
//! construction.
//!
//! # Design
//!
//! All git work goes through the [`ProcessRunner`] trait so the reconciler
//! can be exercised without a git binary. Each invocation's captured output
//! becomes one [`Action`] in an ordered, append-only history; the history is
//! the product, not a log.

mod clone;
mod process;
mod url;

pub use clone::{CloneResult, LocalCloneReconciler};
pub use process::{Action, ApplyOutput, ProcessRunner, TokioProcessRunner};
pub use url::GitUrlHelper;
