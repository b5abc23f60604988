pub mod battle;
pub mod submission;
