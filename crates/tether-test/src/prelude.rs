//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tether_test::prelude::*;` to import all essential types.

// Transports
pub use crate::{RecordingContentTransport, RecordingHostTransport};

// Modules
pub use crate::{HookTracer, MockModule, PanickingModule};

// Harness
pub use crate::{Loopback, init_test_logging};
