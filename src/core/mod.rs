pub mod capacity;
pub mod db;
pub mod form;
pub mod proofs;
pub mod registration;
pub mod roster;
pub mod settings;
