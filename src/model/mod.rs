mod feed;
mod record;

pub use feed::*;
pub use record::*;
