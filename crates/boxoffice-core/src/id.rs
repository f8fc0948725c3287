/// Generates a new globally unique record id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Returns `true` when the caller did not supply a usable id.
pub fn is_blank(id: &str) -> bool {
    id.trim().is_empty()
}
