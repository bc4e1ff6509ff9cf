//! Pure gameplay building blocks: letters, scoring, history, selection and the tray.

pub mod history;
pub mod letters;
pub mod scoring;
pub mod selection;
pub mod tray;
