pub mod executor;
pub mod judge;
pub mod sandbox;
