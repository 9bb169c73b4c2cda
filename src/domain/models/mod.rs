pub mod message;

pub use message::{
    CorrelationKey, DispatchRecord, MAX_BODY_LENGTH, MessageStatus, NewScheduledMessage,
    ScheduledMessage, UpdateOutcome,
};
