pub mod message_dispatcher;
pub mod status_reconciler;
