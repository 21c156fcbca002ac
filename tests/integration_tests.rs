// Gateway file to expose integration tests from the integration/ subdirectory
// This file allows Rust's test runner to discover tests in subdirectories

mod common;

#[path = "integration/test_two_groups.rs"]
mod test_two_groups;

#[path = "integration/test_registry_roundtrip.rs"]
mod test_registry_roundtrip;

#[path = "integration/test_assignment.rs"]
mod test_assignment;

#[path = "integration/test_training_slot.rs"]
mod test_training_slot;
