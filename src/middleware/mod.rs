pub mod timing;

pub use timing::{capture_middleware, instrument, Capture};
