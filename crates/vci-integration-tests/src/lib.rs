//! Cross-crate integration tests for the credential endpoint live under `tests/`.
