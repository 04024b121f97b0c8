pub mod app;
pub mod auth;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod global;
pub mod lights;
pub mod meeting;
pub mod poller;
pub mod window;
