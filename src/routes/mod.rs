/// Router Module Index
///
/// Routes are split by access level. The authentication layer is attached to the
/// `authenticated` router as a whole, so a handler cannot be exposed without it by accident.

/// Routes open to anonymous clients: reads, sign up, log in.
pub mod public;

/// Routes that require a valid bearer token.
pub mod authenticated;
