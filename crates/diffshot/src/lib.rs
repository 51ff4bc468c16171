//! Visual difference reports for pairs of images.
//!
//! [`compare::compare`] decodes two encoded images, normalizes them to a fixed
//! canonical resolution, builds a noise-tolerant change mask, scores it, and
//! stores an annotated PNG through an [`store::OutputSink`].

pub mod compare;
pub mod store;
