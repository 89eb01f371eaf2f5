//! Chat-completion access shared by specialist suggestion and report summarization

mod client;

pub use client::{strip_code_fences, CompletionClient, CompletionError, CompletionService};
