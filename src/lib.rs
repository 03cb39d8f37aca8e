pub mod app;
pub mod attachment;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod disclaimer;
pub mod gemini;
pub mod history;
pub mod logging;
pub mod strings;
pub mod theme;
pub mod ui;
