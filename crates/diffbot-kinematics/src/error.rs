#![warn(missing_docs)]

//! Error types for the kinematics library.
//!
//! This module defines the errors that can occur while building the drive
//! geometry used by the kinematic transforms.

use core::fmt;

/// Errors that can occur in kinematic calculations.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// Error for invalid track width.
    /// This variant is returned when a track width is provided that is not positive and finite.
    InvalidTrackWidth(&'static str),
}

impl fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::InvalidTrackWidth(msg) => write!(f, "Invalid track width: {}", msg),
        }
    }
}

impl core::error::Error for KinematicsError {}
