//! Built-in transformer variants

pub mod mask_rewrite;

pub use mask_rewrite::{MaskRewrite, MaskRewriteFactory};
