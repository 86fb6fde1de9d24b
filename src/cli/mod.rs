pub mod market;
pub mod portfolio;
pub mod ui;
