//! User profile records from the `profiles` table.

use serde::{Deserialize, Serialize};

use kiosk_core::UserId;

/// A user profile.
///
/// The id equals the backend identity id. `avatar_path` holds the storage
/// path of the avatar (the `avatar_url` column), never a fully-qualified
/// URL; public URLs are derived on demand so a backend move never leaves
/// stale absolute URLs in the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Identity id from the auth service.
    pub id: UserId,
    /// Display name.
    pub full_name: String,
    /// Unique handle.
    pub username: String,
    /// Avatar storage path, relative to the avatars bucket.
    #[serde(rename = "avatar_url", default)]
    pub avatar_path: Option<String>,
}
