pub mod allocation;
pub mod examination;
pub mod roster;
