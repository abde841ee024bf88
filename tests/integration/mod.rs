//! Integration Tests Module
//!
//! Scenario tests for the orchestration core, driven by scripted completion
//! and tool backends. Covers the one-turn stream lifecycle, the
//! planner/executor/verifier workflow, and the single-agent reasoning loop.

// Shared scripted mocks and the test harness
mod common;

// One-turn stream consumer lifecycle tests
mod stream_tests;

// Role-pipeline workflow tests
mod pipeline_tests;
