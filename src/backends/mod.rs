// SPDX-License-Identifier: MPL-2.0

//! Backends for the two external inputs of the scanner
//!
//! - [`camera`]: live frame sources and the session that binds them to an analyzer
//! - [`picker`]: single-image selection for the gallery flow

pub mod camera;
pub mod picker;
