//! Request and response data shared by both hops.
//!
//! # Data Flow
//! ```text
//! raw body
//!     → PostalCodeRequest (serde shape)
//!     → PostalCode (8 ASCII digits, checked before any service boundary)
//!     → [location + weather lookups]
//!     → CompositeResult (celsius / fahrenheit / kelvin)
//! ```
//!
//! # Design Decisions
//! - Validation lives in the newtype constructor; holding a `PostalCode`
//!   means the code already passed the 8-digit rule
//! - `CompositeResult` is derived from a single celsius reading and never stored

pub mod postal_code;
pub mod temperature;

pub use postal_code::{is_valid_postal_code, InvalidPostalCode, PostalCode, PostalCodeRequest};
pub use temperature::{convert, CompositeResult, KELVIN_OFFSET};
