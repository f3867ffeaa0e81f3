use app_core::oauth::ProviderProfile;

/// The identity a login resolves to, as seeded from the provider profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthUserProfile {
    pub provider_user_id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl From<ProviderProfile> for OAuthUserProfile {
    fn from(profile: ProviderProfile) -> Self {
        Self {
            provider_user_id: profile.provider_user_id,
            username: profile.login_name,
            avatar_url: profile.avatar_url,
        }
    }
}

/// What happens to a returning user's stored profile on login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfileSync {
    /// Username and avatar stay as they were at account creation.
    #[default]
    Freeze,
    /// Username and avatar are overwritten with the provider's current values.
    Refresh,
}

impl From<bool> for ProfileSync {
    fn from(refresh: bool) -> Self {
        if refresh { ProfileSync::Refresh } else { ProfileSync::Freeze }
    }
}
