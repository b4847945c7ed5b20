// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `scope_tape`. Run with `cargo bench -p scope_tape_wind_tunnel`.
