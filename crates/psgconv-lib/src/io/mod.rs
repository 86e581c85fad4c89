pub mod annotations;
pub mod edf;
pub mod pairing;
pub mod table;
