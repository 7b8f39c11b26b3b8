//! Profile records and partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::ChatIdentity;

/// A stored user profile.
///
/// Created by the first OAuth login (without a student id) or by the
/// first registration submission. Registration is complete once
/// `student_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Opaque document id assigned by the store.
    pub id: String,

    /// LINE user id. The lookup key for every chat-side operation.
    #[serde(default)]
    pub chat_identity: Option<ChatIdentity>,

    /// LINE display name, refreshed on each login.
    #[serde(default)]
    pub display_name: String,

    /// LINE profile picture URL, refreshed on each login.
    #[serde(default)]
    pub picture_url: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Set by registration; its presence is what makes a profile registered.
    #[serde(default, alias = "studentID")]
    pub student_id: Option<String>,

    /// Full name entered on the registration form.
    #[serde(default)]
    pub username: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Last upsert; `None` until the profile is first updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Whether a non-blank student id is on file.
    pub fn is_registered(&self) -> bool {
        self.student_id.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Build a new profile from a patch.
    pub fn from_patch(
        id: impl Into<String>,
        chat_identity: Option<ChatIdentity>,
        patch: &ProfilePatch,
        now: DateTime<Utc>,
    ) -> Self {
        let mut profile = Self {
            id: id.into(),
            chat_identity,
            display_name: String::new(),
            picture_url: None,
            email: None,
            student_id: None,
            username: None,
            created_at: now,
            updated_at: None,
        };
        patch.apply_to(&mut profile);
        profile.updated_at = None;
        profile
    }
}

/// Registration state of a chat identity.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationStatus {
    /// No profile exists for the identity.
    Unknown,
    /// A profile exists but has no student id yet.
    Unregistered(Profile),
    /// A profile with a student id; the user may talk to the agent.
    Registered(Profile),
}

impl RegistrationStatus {
    /// Classify the result of a profile lookup.
    pub fn from_profile(profile: Option<Profile>) -> Self {
        match profile {
            None => Self::Unknown,
            Some(p) if p.is_registered() => Self::Registered(p),
            Some(p) => Self::Unregistered(p),
        }
    }

    /// The profile, unless the identity is unknown.
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Unknown => None,
            Self::Unregistered(p) | Self::Registered(p) => Some(p),
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }
}

/// A partial profile update.
///
/// `None` leaves a field untouched. Registration attributes (`email`,
/// `student_id`, `username`) additionally ignore blank values so a
/// display-only refresh can never erase them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl ProfilePatch {
    /// A patch touching only the display attributes.
    pub fn display(display_name: impl Into<String>, picture_url: Option<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            picture_url,
            ..Default::default()
        }
    }

    /// Whether the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.picture_url.is_none()
            && self.email.is_none()
            && self.student_id.is_none()
            && self.username.is_none()
    }

    /// Merge this patch into `profile`. Returns `true` if anything changed.
    pub fn apply_to(&self, profile: &mut Profile) -> bool {
        let mut changed = false;

        if let Some(name) = &self.display_name
            && profile.display_name != *name
        {
            profile.display_name = name.clone();
            changed = true;
        }
        if let Some(url) = &self.picture_url {
            let url = (!url.is_empty()).then(|| url.clone());
            if profile.picture_url != url {
                profile.picture_url = url;
                changed = true;
            }
        }

        changed |= set_non_blank(&mut profile.email, self.email.as_deref());
        changed |= set_non_blank(&mut profile.student_id, self.student_id.as_deref());
        changed |= set_non_blank(&mut profile.username, self.username.as_deref());
        changed
    }
}

fn set_non_blank(slot: &mut Option<String>, value: Option<&str>) -> bool {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() && slot.as_deref() != Some(v) => {
            *slot = Some(v.to_owned());
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Profile {
        Profile::from_patch(
            "p1",
            Some(ChatIdentity::new("U1")),
            &ProfilePatch::display("Alice", Some("https://img/a.png".into())),
            Utc::now(),
        )
    }

    #[test]
    fn new_profile_is_unregistered() {
        let p = sample();
        assert!(!p.is_registered());
        assert_eq!(p.display_name, "Alice");
        assert!(matches!(
            RegistrationStatus::from_profile(Some(p)),
            RegistrationStatus::Unregistered(_)
        ));
    }

    #[test]
    fn blank_student_id_is_not_registered() {
        let mut p = sample();
        p.student_id = Some("   ".into());
        assert!(!p.is_registered());
    }

    #[test]
    fn status_unknown_without_profile() {
        let status = RegistrationStatus::from_profile(None);
        assert_eq!(status, RegistrationStatus::Unknown);
        assert!(status.profile().is_none());
    }

    #[test]
    fn display_patch_never_clears_registration() {
        let mut p = sample();
        p.student_id = Some("6400001".into());
        p.email = Some("a@example.com".into());

        let patch = ProfilePatch {
            display_name: Some("Alice B".into()),
            email: Some(String::new()),
            student_id: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.apply_to(&mut p));
        assert_eq!(p.display_name, "Alice B");
        assert_eq!(p.student_id.as_deref(), Some("6400001"));
        assert_eq!(p.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn apply_is_idempotent() {
        let mut p = sample();
        let patch = ProfilePatch {
            student_id: Some("6400001".into()),
            username: Some("Alice Smith".into()),
            ..ProfilePatch::display("Alice", None)
        };
        assert!(patch.apply_to(&mut p));
        let snapshot = p.clone();
        assert!(!patch.apply_to(&mut p));
        assert_eq!(p, snapshot);
        assert!(p.is_registered());
    }

    #[test]
    fn profile_json_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["chatIdentity"], "U1");
        assert_eq!(json["displayName"], "Alice");
        assert!(json.get("updatedAt").is_none());
    }

    #[test]
    fn profile_accepts_legacy_student_id_key() {
        let json = serde_json::json!({
            "id": "p9",
            "displayName": "Bob",
            "studentID": "123",
            "createdAt": "2025-01-01T00:00:00Z"
        });
        let p: Profile = serde_json::from_value(json).unwrap();
        assert!(p.is_registered());
    }

    #[test]
    fn empty_patch() {
        assert!(ProfilePatch::default().is_empty());
        assert!(!ProfilePatch::display("x", None).is_empty());
    }
}
