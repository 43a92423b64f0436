//! Profile aggregate.
//!
//! One profile per authenticated user, keyed by the opaque `user_id` the
//! identity layer supplies. A profile is the root of its entity group and
//! owns the conferences created under it.

use serde::{Deserialize, Serialize};

/// T-shirt size choices offered on the profile form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeeShirtSize {
    #[default]
    NotSpecified,
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
    Xxxl,
}

/// Client-supplied profile fields. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileForm {
    pub display_name: Option<String>,
    pub tee_shirt_size: Option<TeeShirtSize>,
}

/// Per-user profile record.
///
/// `user_id` and `main_email` are set at creation and never mutate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    user_id: String,
    display_name: String,
    main_email: String,
    tee_shirt_size: TeeShirtSize,
}

impl Profile {
    /// Construct a fresh profile.
    ///
    /// The display name defaults to the local part of the email when the
    /// form left it blank; the t-shirt size defaults to `NOT_SPECIFIED`.
    pub fn new(
        user_id: impl Into<String>,
        display_name: Option<String>,
        main_email: impl Into<String>,
        tee_shirt_size: Option<TeeShirtSize>,
    ) -> Self {
        let main_email = main_email.into();
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| display_name_from_email(&main_email));

        Self {
            user_id: user_id.into(),
            display_name,
            main_email,
            tee_shirt_size: tee_shirt_size.unwrap_or_default(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn main_email(&self) -> &str {
        &self.main_email
    }

    pub fn tee_shirt_size(&self) -> TeeShirtSize {
        self.tee_shirt_size
    }

    /// Overwrite the mutable fields that were supplied; `None` leaves a
    /// field unchanged.
    pub fn update(&mut self, display_name: Option<String>, tee_shirt_size: Option<TeeShirtSize>) {
        if let Some(name) = display_name.filter(|name| !name.trim().is_empty()) {
            self.display_name = name;
        }
        if let Some(size) = tee_shirt_size {
            self.tee_shirt_size = size;
        }
    }
}

/// Display-name fallback: the part of the email before the first `@`, or
/// the whole string when there is none.
pub fn display_name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
