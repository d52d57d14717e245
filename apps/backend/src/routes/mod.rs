pub mod cards;
pub mod session;
