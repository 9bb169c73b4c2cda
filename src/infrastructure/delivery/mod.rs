pub mod stub;
pub mod twilio;
