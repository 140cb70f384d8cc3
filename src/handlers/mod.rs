// handlers/mod.rs - HTTP handlers behind the access gate
//
// Page routes are rendered elsewhere; the handlers here cover the pieces the
// service itself answers: liveness, the signed-in viewer, sign-out, and a
// placeholder for page pass-through.

pub mod health;
pub mod pages;
pub mod session;

pub use health::health;
pub use pages::{page, root};
pub use session::{me, sign_out};
