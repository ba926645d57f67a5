//! Form domain layer
//!
//! Key-value panels bound to JSON payloads, and forms submitted as JSON to
//! an endpoint.

mod binder;
mod field;
mod submitter;

pub use binder::{BinderError, FieldSet, KvPanel};
pub use field::FormField;
pub use submitter::{
    BoundForm, BusyFlag, BusyToken, FormSubmitter, StatusClass, StatusLine, SubmissionPhase,
    SubmissionResult, SubmitForm,
};
