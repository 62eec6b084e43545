pub mod scorer;
pub mod rank;
