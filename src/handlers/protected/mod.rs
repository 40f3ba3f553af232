// handlers/protected/mod.rs - Session-authenticated handlers (/api/*)
//
// Every handler here receives the caller's SessionContext from
// session_auth_middleware and acts on that user's data only.

pub mod gallery;
pub mod images;
pub mod session;

pub use gallery::gallery_get;
pub use images::{images_get, images_post, images_url_post};
pub use session::whoami;
