pub mod agents;
pub mod check;
pub mod config;
pub mod diff_report;
pub mod drafter;
pub mod pipeline;
pub mod prompts;
pub mod tools;
