//! Integration tests for the NextNode page and block stores

mod integration;
