/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
/// Room, game and answer ledger persistence backends.
pub mod trivia_store;
