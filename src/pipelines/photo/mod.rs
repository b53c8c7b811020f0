// SPDX-License-Identifier: MPL-2.0

//! Still photo pipeline
//!
//! ```text
//! CaptureController ──▶ session worker ──▶ device still request
//!                                              │
//!                         image sink ◀─────────┘
//!                             │
//!                             ▼
//!                        ImageWriter ──▶ IMG_yyyyMMdd_HHmmss.jpg
//! ```
//!
//! The preview keeps running while a still is requested, delivered and
//! written.

pub mod capture;

pub use capture::CaptureController;
pub(crate) use capture::CaptureTracker;
