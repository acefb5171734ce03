//! Profile session: fetch-or-create, update, avatar replacement.
//!
//! The session owns the cached profile and publishes it on a watch channel.
//! Reloads are serialized by an operation lock so two of them never
//! interleave into inconsistent cache writes.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::gateway::{GatewayError, RemoteGateway, decode};
use crate::models::Profile;

/// Table profiles are stored in, keyed by identity id.
pub const PROFILES_TABLE: &str = "profiles";

/// Bucket avatars are uploaded to.
pub const AVATAR_BUCKET: &str = "avatars";

/// Errors from profile operations.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// No identity; profile operations require a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// Username was blank.
    #[error("username cannot be blank")]
    BlankUsername,

    /// The backend rejected or failed the remote step.
    #[error("backend error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Owns the signed-in user's profile for the lifetime of a session.
pub struct ProfileSession {
    gateway: Arc<dyn RemoteGateway>,
    cache: watch::Sender<Option<Profile>>,
    /// Serializes load/update/upload so reloads never interleave.
    op: tokio::sync::Mutex<()>,
}

impl ProfileSession {
    /// Create a session with an empty cache.
    #[must_use]
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        let (cache, _) = watch::channel(None);
        Self {
            gateway,
            cache,
            op: tokio::sync::Mutex::new(()),
        }
    }

    /// The cached profile, if one has been loaded.
    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.cache.borrow().clone()
    }

    /// Subscribe to profile changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Profile>> {
        self.cache.subscribe()
    }

    /// Fetch the profile, creating it with derived defaults on first login.
    ///
    /// A missing profile is synthesized from the account email's local
    /// part - dots become spaces and each word is capitalized for the
    /// display name, dots become underscores for the username - and
    /// persisted immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotAuthenticated`] without an identity, and
    /// [`ProfileError::Gateway`] on remote failure; the cache is left
    /// unchanged in both cases.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Profile, ProfileError> {
        let _op = self.op.lock().await;
        self.load_locked().await
    }

    /// Update display name and username, then refresh the cache.
    ///
    /// A reload failure after the write succeeded is logged and not
    /// reported as an update failure.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::BlankUsername`] for a blank username,
    /// [`ProfileError::NotAuthenticated`] without an identity, and
    /// [`ProfileError::Gateway`] if the write itself fails.
    #[instrument(skip(self))]
    pub async fn update(&self, full_name: &str, username: &str) -> Result<(), ProfileError> {
        if username.trim().is_empty() {
            return Err(ProfileError::BlankUsername);
        }

        let _op = self.op.lock().await;
        let identity = self.identity().await?;

        self.gateway
            .update(
                PROFILES_TABLE,
                "id",
                &identity.id.to_string(),
                json!({ "full_name": full_name, "username": username }),
            )
            .await?;

        if let Err(e) = self.load_locked().await {
            warn!(error = %e, "profile reload after update failed");
        }
        Ok(())
    }

    /// Replace the avatar: upload to the fixed per-user path, persist the
    /// path, then refresh the cache.
    ///
    /// The stored reference is the storage path, never an absolute URL;
    /// derive one with [`ProfileSession::avatar_url`]. Returns the path.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotAuthenticated`] without an identity and
    /// [`ProfileError::Gateway`] if the upload or the write fails.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn upload_avatar(&self, bytes: Vec<u8>) -> Result<String, ProfileError> {
        let _op = self.op.lock().await;
        let identity = self.identity().await?;

        let path = format!("{}/avatar.png", identity.id);
        self.gateway
            .upload_object(AVATAR_BUCKET, &path, bytes, true)
            .await?;

        self.gateway
            .update(
                PROFILES_TABLE,
                "id",
                &identity.id.to_string(),
                json!({ "avatar_url": path }),
            )
            .await?;

        if let Err(e) = self.load_locked().await {
            warn!(error = %e, "profile reload after avatar upload failed");
        }
        Ok(path)
    }

    /// Public URL for a profile's avatar, derived from the stored path.
    #[must_use]
    pub fn avatar_url(&self, profile: &Profile) -> Option<String> {
        profile
            .avatar_path
            .as_ref()
            .map(|path| self.gateway.public_url(AVATAR_BUCKET, path))
    }

    async fn identity(&self) -> Result<crate::gateway::Identity, ProfileError> {
        self.gateway
            .current_identity()
            .await?
            .ok_or(ProfileError::NotAuthenticated)
    }

    /// Load with the operation lock already held.
    async fn load_locked(&self) -> Result<Profile, ProfileError> {
        let identity = self.identity().await?;
        let id = identity.id.to_string();

        let profile = match self.gateway.find_one(PROFILES_TABLE, "id", &id).await? {
            Some(record) => decode::<Profile>(record).map_err(ProfileError::Gateway)?,
            None => {
                let local = identity.email.local_part();
                let profile = Profile {
                    id: identity.id,
                    full_name: display_name_from(local),
                    username: local.replace('.', "_"),
                    avatar_path: None,
                };
                let record =
                    serde_json::to_value(&profile).map_err(GatewayError::from)?;
                self.gateway.insert(PROFILES_TABLE, record).await?;
                debug!(user_id = %profile.id, "created default profile");
                profile
            }
        };

        self.cache.send_replace(Some(profile.clone()));
        Ok(profile)
    }
}

/// Derive a display name from an email local part: dots become spaces and
/// each word gets a capital first letter.
fn display_name_from(local: &str) -> String {
    local
        .split('.')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kiosk_core::{Email, UserId};
    use serde_json::json;
    use uuid::Uuid;

    use crate::gateway::MemoryGateway;

    use super::*;

    fn session_for(email: &str) -> (Arc<MemoryGateway>, ProfileSession, UserId) {
        let gateway = Arc::new(MemoryGateway::new());
        let id = UserId::generate();
        gateway.sign_in_as(id, &Email::parse(email).unwrap());
        let session = ProfileSession::new(Arc::clone(&gateway) as Arc<dyn RemoteGateway>);
        (gateway, session, id)
    }

    #[test]
    fn test_display_name_derivation() {
        assert_eq!(display_name_from("jane.doe"), "Jane Doe");
        assert_eq!(display_name_from("jane"), "Jane");
        assert_eq!(display_name_from("j.r.r.tolkien"), "J R R Tolkien");
    }

    #[tokio::test]
    async fn test_load_creates_default_profile_on_first_login() {
        let (gateway, session, id) = session_for("jane.doe@example.com");

        let profile = session.load().await.unwrap();

        assert_eq!(profile.id, id);
        assert_eq!(profile.full_name, "Jane Doe");
        assert_eq!(profile.username, "jane_doe");
        assert_eq!(profile.avatar_path, None);

        // The default profile was persisted, not just cached.
        let rows = gateway.records(PROFILES_TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().unwrap()["username"], "jane_doe");
    }

    #[tokio::test]
    async fn test_load_returns_existing_profile_unchanged() {
        let (gateway, session, id) = session_for("jane.doe@example.com");
        gateway.seed(
            PROFILES_TABLE,
            json!({
                "id": id,
                "full_name": "Janet",
                "username": "janet",
                "avatar_url": null,
            }),
        );

        let profile = session.load().await.unwrap();

        assert_eq!(profile.full_name, "Janet");
        assert_eq!(gateway.records(PROFILES_TABLE).len(), 1);
        assert_eq!(session.profile(), Some(profile));
    }

    #[tokio::test]
    async fn test_load_without_identity() {
        let gateway = Arc::new(MemoryGateway::new());
        let session = ProfileSession::new(gateway);
        assert!(matches!(
            session.load().await,
            Err(ProfileError::NotAuthenticated)
        ));
        assert_eq!(session.profile(), None);
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_cache_unchanged() {
        let (gateway, session, _) = session_for("jane.doe@example.com");
        let loaded = session.load().await.unwrap();

        gateway.fail_next("find_one", "backend down");
        assert!(matches!(
            session.load().await,
            Err(ProfileError::Gateway(_))
        ));
        assert_eq!(session.profile(), Some(loaded));
    }

    #[tokio::test]
    async fn test_update_persists_and_reloads() {
        let (gateway, session, _) = session_for("jane.doe@example.com");
        session.load().await.unwrap();

        session.update("Jane D.", "janed").await.unwrap();

        assert_eq!(session.profile().unwrap().username, "janed");
        let rows = gateway.records(PROFILES_TABLE);
        assert_eq!(rows.first().unwrap()["full_name"], "Jane D.");
    }

    #[tokio::test]
    async fn test_update_rejects_blank_username_locally() {
        let (gateway, session, _) = session_for("jane.doe@example.com");
        let calls = gateway.remote_calls();

        assert!(matches!(
            session.update("Jane", "   ").await,
            Err(ProfileError::BlankUsername)
        ));
        assert_eq!(gateway.remote_calls(), calls);
    }

    #[tokio::test]
    async fn test_reload_failure_after_successful_write_is_not_an_error() {
        let (gateway, session, _) = session_for("jane.doe@example.com");
        session.load().await.unwrap();

        // The write succeeds; the follow-up reload fails.
        gateway.fail_next("find_one", "flaky read");
        session.update("Jane", "jane2").await.unwrap();

        // Persisted despite the failed refresh.
        let rows = gateway.records(PROFILES_TABLE);
        assert_eq!(rows.first().unwrap()["username"], "jane2");
    }

    #[tokio::test]
    async fn test_avatar_round_trip() {
        let (gateway, session, id) = session_for("jane.doe@example.com");
        session.load().await.unwrap();

        let path = session.upload_avatar(vec![0xAB; 32]).await.unwrap();

        assert_eq!(path, format!("{id}/avatar.png"));
        assert_eq!(gateway.object(AVATAR_BUCKET, &path), Some(vec![0xAB; 32]));

        // The profile stores the path, and the public URL contains it
        // verbatim.
        let profile = session.profile().unwrap();
        assert_eq!(profile.avatar_path.as_deref(), Some(path.as_str()));
        let url = session.avatar_url(&profile).unwrap();
        assert!(url.contains(&path));
    }

    #[tokio::test]
    async fn test_avatar_upload_overwrites_previous() {
        let (gateway, session, _) = session_for("jane.doe@example.com");
        session.load().await.unwrap();

        session.upload_avatar(vec![1]).await.unwrap();
        let path = session.upload_avatar(vec![2]).await.unwrap();

        assert_eq!(gateway.object(AVATAR_BUCKET, &path), Some(vec![2]));
        assert_eq!(gateway.object_paths(AVATAR_BUCKET).len(), 1);
    }

    #[tokio::test]
    async fn test_default_profile_for_plain_local_part() {
        let (_, session, _) = session_for("bob@example.com");
        let profile = session.load().await.unwrap();
        assert_eq!(profile.full_name, "Bob");
        assert_eq!(profile.username, "bob");
    }

    #[test]
    fn test_uuid_serialization_matches_filter_format() {
        // `field_matches` compares string forms; UserId must serialize to
        // its hyphenated string.
        let id = UserId::new(Uuid::nil());
        assert_eq!(
            serde_json::to_value(id).unwrap(),
            json!("00000000-0000-0000-0000-000000000000")
        );
    }
}
