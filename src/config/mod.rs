// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;

pub use client::{ClientConfig, RetryConfig, DEFAULT_ENDPOINT_PATH};
