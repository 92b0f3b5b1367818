//! The composite canvas and its insertion rules.
//!
//! Reprojected inputs are recorded in an [`ImageComposite`], wrapped across
//! the antimeridian by [`insert_wrapped`], and rendered once by
//! [`ImageComposite::prepare`] into a [`PreparedComposite`] for the tile
//! generator.

mod canvas;
mod progress;
mod wrap;

pub use canvas::{BlendMode, ImageComposite, Insertion, PreparedComposite};
pub use progress::{LogProgress, NullProgress, ProgressCallback};
pub use wrap::{insert_wrapped, plan_insertions};
