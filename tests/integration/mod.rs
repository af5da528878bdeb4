//! Integration test suite for the orchestrator.
//!
//! These tests drive `WorkflowController` through whole pipeline runs and
//! check what ends up on disk. Every test works in its own temporary
//! checkpoint directory.
//!
//! # Test Categories
//!
//! - `workflow_e2e`: Full pipeline runs, rejections and rollback
//! - `recovery`: Resuming from checkpoints in a fresh controller
//! - `retention`: Checkpoint pruning across many operations
//! - `shared_handle`: Serialized access from concurrent tasks


mod recovery;
mod shared_handle;
