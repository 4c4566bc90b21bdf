pub mod dashboard;
pub mod selection;
pub mod setup;
pub mod ui;
