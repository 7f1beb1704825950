// Copyright (c) 2026 Aperture Contributors. MIT License.
// See LICENSE for details.

//! # Aperture — Core Library
//!
//! Aperture is a biometric-gated transaction signer: a face at the camera is
//! the only thing standing between a payment request and a signed transfer.
//! This crate is the part that has to get it right.
//!
//! The pipeline is deliberately boring and strictly ordered: capture a frame,
//! match it against the enrolled templates, scan a visual code carrying the
//! payment request, build and sign a transfer with the locally held key, and
//! render the signed artifact back into a visual code for the reader on the
//! other side of the counter. Every step blocks on the previous one. There is
//! no cleverness to extract from concurrency here — a camera has one coherent
//! reader and a session has one coherent outcome.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of the
//! pipeline:
//!
//! - **capture** — Frames and the camera capability. One reader at a time.
//! - **biometric** — Templates, enrollment, and the matching policy.
//!   Ambiguity is a refusal, never an authorization.
//! - **transport** — The visual code codec. Deterministic in, forgiving out.
//! - **transaction** — Addresses, amounts, the wallet key, and the signing
//!   path. No floating point survives past validation.
//! - **ledger** — The one thing we need from the network: a recent anchor.
//! - **session** — The single-use state machine that sequences all of the
//!   above and owns every terminal outcome.
//! - **config** — Protocol constants. Magic numbers live here or nowhere.
//!
//! ## Design Philosophy
//!
//! 1. Expected conditions are values, not exceptions. "No face yet" is a
//!    poll result; "the signing primitive failed" is an error.
//! 2. Everything the session needs is passed in at construction. No statics,
//!    no globals, no ambient authority.
//! 3. A session signs at most once, and only after a positive match. The
//!    type system enforces what the tests then prove.

pub mod biometric;
pub mod capture;
pub mod config;
pub mod ledger;
pub mod session;
pub mod transaction;
pub mod transport;
