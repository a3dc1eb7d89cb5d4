/// Router Module Index
///
/// Routes are grouped by who may call them, and each group gets its access layer in
/// `create_router`. Adding a route to the wrong module is the only way to expose it.

/// Routes open to everyone, logged in or not.
pub mod public;

/// Routes that need a logged-in user; anonymous callers are sent to `/login`.
pub mod authenticated;

/// Routes reserved for the admin account.
pub mod admin;
