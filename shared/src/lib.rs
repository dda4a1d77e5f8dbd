pub mod events;
pub mod record;
pub mod status;

pub use events::*;
pub use record::*;
pub use status::*;
