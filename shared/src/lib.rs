//! Shared components for the magnetic servo workspace.
//!
//! Contains the frame source abstraction, frame geometry, and the
//! image-processing primitives used by the localizer.

pub mod camera_interface;
pub mod image_proc;
pub mod image_size;
