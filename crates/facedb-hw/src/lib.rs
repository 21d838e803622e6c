//! facedb-hw — V4L2 camera capture for the live collection loop.
//!
//! Opens a capture device, negotiates a grayscale-convertible pixel format
//! and streams frames as 8-bit grayscale rasters.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, FrameStream, PixelFormat};
pub use frame::Frame;
