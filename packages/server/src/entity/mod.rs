pub mod battle;
pub mod problem;
pub mod solved_problem;
pub mod submission;
pub mod test_case;
pub mod user;
