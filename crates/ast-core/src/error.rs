// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Errors for the one class of failure this crate raises: programmer-contract
//! violations. Everything else (a builder rejecting input, a matcher failing
//! to match, a diff operation hitting an already-converted slot) is reported
//! through a plain `bool`/`Option` return, never through this type.

use thiserror::Error;

/// A programmer-contract violation: the caller did something the API
/// explicitly disallows (build from an invalid `Builder`, index an `Action`
/// past its fixed arity).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("cannot create a node from an invalid builder for type `{type_name}`")]
    InvalidBuilder { type_name: String },

    #[error("action of kind `{kind}` has no child at index {index} (arity {arity})")]
    ActionChildOutOfBounds {
        kind: &'static str,
        index: usize,
        arity: usize,
    },
}
