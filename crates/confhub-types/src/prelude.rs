pub use crate::error::{ChResult, Error};

pub use tracing::{debug, error, info, warn};

// vim: ts=4
