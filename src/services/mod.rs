/// Answer ledger: gated submission and lookup.
pub mod answer_service;
/// Host and self checks on session identities.
pub mod authorization;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game lifecycle engine and round listing.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Room creation, joining and settings.
pub mod room_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;

#[cfg(test)]
mod fixtures;
