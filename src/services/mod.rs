// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Domain services.

pub mod connect_key;
pub mod normalize;

pub use connect_key::ConnectKeyService;
