//! Text rendering and layout composition.

pub mod canvas;
pub mod compose;
pub mod dashboard;
pub mod metadata;
pub mod text;

pub use canvas::{FontFace, LumaCanvas, Weight};
pub use compose::{ComposedFrame, FrameOptions, LayoutRect, compose_frame, compose_sidebar};
pub use dashboard::{DashboardOptions, render_dashboard};
pub use metadata::{
    DESCRIPTION_MAX_LINES, LOCATION_MAX_LINES, MetadataCanvas, NAME_MAX_LINES, PhotoMetadata,
    TextStyle, render_metadata,
};
pub use text::{TextBlock, wrap_text};
