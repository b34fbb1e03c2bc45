//! Perch core library: agent, task runner, log relay, and session controller
//! shared by the CLI and desktop applications.

pub mod agent;
pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod init;
pub mod llm;
pub mod relay;
pub mod runner;
pub mod session;
pub mod tools;
pub mod transcript;
