// SPDX-License-Identifier: GPL-3.0-only

//! Camera backends

pub mod camera;
pub mod virtual_camera;
