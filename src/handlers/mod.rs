// handlers/mod.rs - 2-Tier Handler Architecture
//
// Public (no auth) → Protected (session token required)
pub mod protected; // Tier 2: session authentication required (/api/*)
pub mod public; // Tier 1: no authentication required
