mod battle;
mod common;
mod store;
mod submission;
