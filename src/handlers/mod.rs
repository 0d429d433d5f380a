// handlers/mod.rs - Two handler tiers
//
// Public (no auth) -> Protected (JWT auth). Both are nested under the
// configured API prefix by `app()`.

pub mod protected;
pub mod public;
