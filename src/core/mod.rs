pub mod aggregator;
pub mod live_view;
pub mod submission;
pub mod validator;

pub use crate::domain::model::{
    CollectionPath, DateWindow, DayTally, Nomination, NominationRecord, Session, Slot,
};
pub use crate::domain::ports::{AuthProvider, NominationStore, SnapshotEvent, Subscription};
pub use crate::utils::error::Result;
