//! `/api/instagram/*`

mod advertisements;
mod events;
mod posts;
mod stories;

pub use advertisements::*;
pub use events::*;
pub use posts::*;
pub use stories::*;
