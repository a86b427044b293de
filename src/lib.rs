// imgtouch - Image viewer model with zoom, pan and thumbnail helpers
// The UI layer owns a `Viewer` and forwards button and pointer events to it

pub mod error;
pub mod geometry;
pub mod image_loader;
pub mod thumbnail;
pub mod viewer;

pub use error::ThumbnailError;
pub use geometry::{Point, Size};
pub use thumbnail::{generate_thumbnail, scaled_thumbnail, Quality};
pub use viewer::{Viewer, ViewerCommand, ViewerConfig, ZoomCommand};
