//! Input handling: the Pajek splitter and the derived tables

pub mod pajek;
pub mod tables;
