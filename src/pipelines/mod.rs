// SPDX-License-Identifier: MPL-2.0

//! Preview and still pipelines
//!
//! - [`preview`]: stream size selection and the display transform
//! - [`photo`]: still capture requests

pub mod photo;
pub mod preview;
