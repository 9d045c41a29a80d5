//! `/api/youtube/*`

mod channels;
mod videos;

pub use channels::*;
pub use videos::*;
