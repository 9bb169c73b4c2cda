pub mod callbacks;
pub mod health;
pub mod messages;
pub mod root;
