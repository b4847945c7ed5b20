// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end conformance tests for `scope_tape`.
//!
//! This crate has no library API; the tests live in `tests/conformance.rs`.
