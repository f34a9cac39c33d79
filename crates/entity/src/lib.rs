//! Storage schemas for the CRM records.
//!
//! References between records are plain UUID columns. There are no foreign
//! keys: deleting a record never touches the records pointing at it, and
//! readers resolve dangling references to nothing.

pub mod activity;
pub mod company;
pub mod contact;
pub mod deal;
pub mod shared;
pub mod subject;
pub mod task;
pub mod user;
pub mod user_secret;

pub use subject::{ActivitySubject, SubjectKind, TaskTarget};
