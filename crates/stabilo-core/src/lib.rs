//! Stabilo Core - Foundation types for video stabilization
//!
//! This crate provides the types shared by every Stabilo crate:
//! - Frame buffers (packed RGB8)
//! - Regions of interest and inter-frame motion
//! - Frame rates
//! - The frame source/sink traits the passes are written against

pub mod error;
pub mod frame;
pub mod geometry;
pub mod source;
pub mod time;

pub use error::{Result, StabiloError};
pub use frame::Frame;
pub use geometry::{zoom_about, Roi, Transform2D};
pub use source::{
    CenteredRegion, FixedRegion, FrameSink, FrameSource, ImageWriter, MemorySink, MemorySource,
    RegionSelector,
};
pub use time::FrameRate;
