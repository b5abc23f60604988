pub mod battle;
pub mod health;
pub mod submission;
pub mod ws;
