#![allow(dead_code)] // API surface kept for future tooling and tests

pub mod logger;

pub mod app;
pub mod bounds;
pub mod overlay;
pub mod recognition;
pub mod session;
pub mod surface;
pub mod typeset;
