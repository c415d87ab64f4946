//! Error handling foundation for chime.
//!
//! Only the `Result` alias lives here. Each crate defines its own
//! domain-specific error enums and wraps them in a rootcause `Report`
//! where layered context is useful (process startup, for example).

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
