// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Shared settings types used across the authorization core's crates.
//! One purpose is to optimize compile time during development.

pub mod settings;
