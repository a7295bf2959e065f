pub use confhub_types::prelude::*;

// vim: ts=4
