// handlers/public/mod.rs - Public handlers
//
// Endpoints reachable without a session token: the page itself, sign-in,
// media downloads and the health probe.

pub mod health;
pub mod media;
pub mod page;
pub mod sign_in;

pub use health::health;
pub use media::media_get;
pub use page::index;
pub use sign_in::sign_in;
