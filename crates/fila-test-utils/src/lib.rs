// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Fila integration tests.

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
