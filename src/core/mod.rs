//! Core data types.
//!
//! - **shadow**: Cell grid mirroring what has been drawn
//! - **event**: Terminal events and their wire format

pub mod event;
pub mod shadow;
