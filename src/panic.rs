//! Formatting for panic payloads caught around handler invocations.

use std::{any::Any, fmt};

/// Displayable wrapper around a caught panic payload.
///
/// `String` and `&'static str` payloads print their message; anything else
/// prints a placeholder naming the payload as opaque.
///
/// ```
/// use bundlewire::panic::format_panic;
///
/// assert_eq!(format_panic(Box::new("boom")).to_string(), "boom");
/// assert_eq!(format_panic(Box::new(String::from("bang"))).to_string(), "bang");
/// assert_eq!(format_panic(Box::new(5_u32)).to_string(), "<non-string panic payload>");
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl PanicMessage {
    /// The panic message, when the payload was a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| self.0.downcast_ref::<&'static str>().copied())
    }
}

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("<non-string panic payload>"))
    }
}

/// Wrap a caught panic payload for logging.
pub fn format_panic(panic: Box<dyn Any + Send>) -> PanicMessage { PanicMessage(panic) }
