// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;
pub mod render;
pub mod request;

pub use client::HostClient;
pub use render::{render_channel_error, render_input_error, render_response, render_transport_error};
pub use request::{ExpansionRequest, InputError, PreparedRequest};
