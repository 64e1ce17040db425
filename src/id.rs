//! Layer id generation.
//!
//! Ids are 12-character lowercase hex tokens. They are generated once at layer
//! creation and never reused; cloning a subtree regenerates every id in it.

/// Generate a fresh layer id: 12 lowercase hex chars drawn from a v4 UUID.
pub fn generate_layer_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    let hex = uuid.simple().to_string();
    hex[..12].to_string()
}
