pub mod annotation;
pub mod color_mask;
pub mod hough;
pub mod preprocessing;

pub use annotation::*;
pub use color_mask::*;
pub use hough::*;
pub use preprocessing::*;
