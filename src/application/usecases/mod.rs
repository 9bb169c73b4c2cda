pub mod delete_message;
pub mod get_message;
pub mod list_messages;
pub mod schedule_message;
pub mod update_message;
pub mod validation;
