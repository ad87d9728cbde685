pub mod fiscal;
pub mod migrate;
pub mod tenant;
