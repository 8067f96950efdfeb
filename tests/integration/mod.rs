//! Integration tests for the NextNode page and block stores

mod cli_commands;
mod document_flow;
mod failing_store;
mod navigation_flow;
mod page_tree_flow;
mod persistence_round_trip;
mod properties;
mod support;
