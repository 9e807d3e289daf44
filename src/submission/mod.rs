//! Validation and assembly of the create-listing multipart payload, plus the
//! submission state machine.

pub mod ads;
pub mod auth;

use crate::expertise::ExpertiseInfo;
use crate::media::{MediaError, MediaFile, MediaStager};
use crate::models::{Selection, SelectionSlugs};
use crate::profile::{FeatureSet, FormProfile};
use chrono::{Datelike, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use ads::{AdCreated, AdPublisher, AdsClient};
pub use auth::{EnvTokenStore, MemoryTokenStore, TokenStore};

/// Showcase, gallery and videos combined.
pub const MAX_MEDIA: usize = 18;
const MIN_YEAR: i32 = 1900;
const GENERIC_FAILURE: &str = "An error occurred while creating the listing";
/// Written by `assemble` itself; same-named scalar inputs are ignored.
const RESERVED_FIELDS: &[&str] = &["currency", "features", "hasExpertiseInfo", "expertiseInfo"];

/// Keeps ASCII digits only.
pub fn normalize_digits(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Groups digits in threes with `.` for display. Leading zeros are kept so
/// that normalizing the result gives the digits back.
pub fn format_thousands(input: &str) -> String {
    let digits = normalize_digits(input);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a showcase photo is required")]
    MissingShowcase,
    #[error("at most {max} photos and videos can be attached ({count} staged)")]
    TooManyMedia { count: usize, max: usize },
    #[error("`{field}` is required")]
    MissingField { field: String },
    #[error("select a brand")]
    MissingBrand,
    #[error("select a model")]
    MissingModel,
    #[error("select a city")]
    MissingCity,
    #[error("select a district")]
    MissingDistrict,
    #[error("enter a valid year")]
    InvalidYear,
    #[error("enter a valid price")]
    InvalidPrice,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("`{key}` is not a feature of this form")]
    Unknown { key: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Currency {
    #[default]
    Try,
    Usd,
    Eur,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Try => "TRY",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TRY" | "TL" => Ok(Currency::Try),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(format!("unsupported currency `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("your session has expired, please sign in again")]
    SessionExpired,
    #[error("a submission is already in progress")]
    Busy,
    #[error("listing rejected (HTTP {status})")]
    Rejected { status: u16, message: Option<String> },
    #[error("request failed: {0}")]
    Transport(String),
}

impl SubmitError {
    /// Text shown to the seller; prefers the server's own message.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            SubmitError::Rejected { .. } | SubmitError::Transport(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Scalar inputs by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    values: BTreeMap<String, String>,
}

impl FormFields {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn is_blank(&self, name: &str) -> bool {
        self.get(name).is_none_or(|v| v.trim().is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FormFields::default();
        for (k, v) in iter {
            fields.set(k, v);
        }
        fields
    }
}

/// Checked state over the profile's closed feature set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFlags {
    set: FeatureSet,
    checked: BTreeMap<String, bool>,
}

impl FeatureFlags {
    pub fn new(set: FeatureSet) -> Self {
        Self {
            set,
            checked: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, on: bool) -> Result<(), FeatureError> {
        if !self.set.contains(key) {
            return Err(FeatureError::Unknown {
                key: key.to_string(),
            });
        }
        self.checked.insert(key.to_string(), on);
        Ok(())
    }

    pub fn toggle(&mut self, key: &str) -> Result<bool, FeatureError> {
        let next = !self.is_checked(key);
        self.set(key, next)?;
        Ok(next)
    }

    pub fn is_checked(&self, key: &str) -> bool {
        self.checked.get(key).copied().unwrap_or(false)
    }

    /// JSON object of the checked features. Grouped sets nest each group's
    /// keys under the group name, with every group present.
    pub fn to_json(&self) -> String {
        let on = |group: Option<&str>| -> serde_json::Map<String, serde_json::Value> {
            self.checked
                .iter()
                .filter(|(k, on)| **on && self.set.group_of(k) == Some(group))
                .map(|(k, _)| (k.clone(), serde_json::Value::Bool(true)))
                .collect()
        };
        let value = match self.set {
            FeatureSet::Flat(_) => serde_json::Value::Object(on(None)),
            FeatureSet::Grouped(groups) => serde_json::Value::Object(
                groups
                    .iter()
                    .map(|(group, _)| (group.to_string(), serde_json::Value::Object(on(Some(*group)))))
                    .collect(),
            ),
        };
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub field: String,
    pub file: MediaFile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub fields: Vec<(String, String)>,
    pub attachments: Vec<Attachment>,
}

impl SubmissionPayload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attachment_names(&self) -> Vec<&str> {
        self.attachments.iter().map(|a| a.field.as_str()).collect()
    }

    fn push(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.fields.push((name.to_string(), value));
        }
    }

    fn attach(&mut self, field: impl Into<String>, file: &MediaFile) {
        self.attachments.push(Attachment {
            field: field.into(),
            file: file.clone(),
        });
    }
}

/// Everything one form contributes to a submission.
pub struct SubmissionInput<'a> {
    pub profile: &'a FormProfile,
    pub fields: &'a FormFields,
    pub currency: Currency,
    pub features: &'a FeatureFlags,
    pub expertise: &'a ExpertiseInfo,
    pub selection: &'a Selection,
    pub slugs: &'a SelectionSlugs,
    pub media: &'a MediaStager,
}

/// Local checks run before any network call.
pub fn validate(input: &SubmissionInput<'_>) -> Result<(), ValidationError> {
    if !input.media.has_showcase() {
        return Err(ValidationError::MissingShowcase);
    }
    let count = input.media.media_count();
    if count > MAX_MEDIA {
        return Err(ValidationError::TooManyMedia {
            count,
            max: MAX_MEDIA,
        });
    }
    for field in input.profile.required_fields {
        if input.fields.is_blank(field) {
            return Err(ValidationError::MissingField {
                field: field.to_string(),
            });
        }
    }
    if let Some(year) = input.fields.get("year").filter(|y| !y.trim().is_empty()) {
        let max_year = Utc::now().year() + 1;
        match year.trim().parse::<i32>() {
            Ok(y) if (MIN_YEAR..=max_year).contains(&y) => {}
            _ => return Err(ValidationError::InvalidYear),
        }
    }
    if let Some(price) = input.fields.get("price") {
        let digits = normalize_digits(price);
        if !digits.is_empty() && digits.chars().all(|c| c == '0') {
            return Err(ValidationError::InvalidPrice);
        }
    }
    if input.selection.brand_id.is_none() {
        return Err(ValidationError::MissingBrand);
    }
    if input.selection.model_id.is_none() {
        return Err(ValidationError::MissingModel);
    }
    if input.selection.city_id.is_none() {
        return Err(ValidationError::MissingCity);
    }
    if input.selection.district_id.is_none() {
        return Err(ValidationError::MissingDistrict);
    }
    Ok(())
}

/// Validates, then lays out fields and attachments in submission order.
pub fn assemble(input: &SubmissionInput<'_>) -> Result<SubmissionPayload, ValidationError> {
    validate(input)?;
    let mut payload = SubmissionPayload::default();

    for (name, value) in input.fields.iter() {
        if RESERVED_FIELDS.contains(&name) {
            continue;
        }
        if input.profile.is_numeric(name) {
            payload.push(name, normalize_digits(value));
        } else {
            payload.push(name, value.trim());
        }
    }
    payload.push("currency", input.currency.as_str());

    let selection = input.selection;
    for (name, value) in [
        ("categoryId", &selection.category_id),
        ("brandId", &selection.brand_id),
        ("modelId", &selection.model_id),
        ("variantId", &selection.variant_id),
        ("cityId", &selection.city_id),
        ("districtId", &selection.district_id),
        ("categorySlug", &input.slugs.category),
        ("brandSlug", &input.slugs.brand),
        ("modelSlug", &input.slugs.model),
        ("variantSlug", &input.slugs.variant),
    ] {
        if let Some(value) = value {
            payload.push(name, value.as_str());
        }
    }
    payload.push("features", input.features.to_json());
    for (name, value) in input.expertise.fields() {
        payload.push(name, value);
    }

    let media = input.media;
    if let Some(showcase) = media.showcase() {
        payload.attach("showcasePhoto", showcase.file());
    }
    for (i, photo) in media.photos().iter().enumerate() {
        payload.attach(format!("photo_{i}"), photo.file());
    }
    for (i, video) in media.videos().iter().enumerate() {
        payload.attach(format!("video_{i}"), video.file());
    }
    if let Some(report) = media.report() {
        payload.attach("expertiseReport", report.file());
    }
    Ok(payload)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded(AdCreated),
    Failed {
        message: String,
    },
}

impl SubmissionState {
    pub fn begin(&mut self) -> Result<(), SubmitError> {
        match self {
            SubmissionState::Submitting | SubmissionState::Succeeded(_) => Err(SubmitError::Busy),
            _ => {
                *self = SubmissionState::Submitting;
                Ok(())
            }
        }
    }

    pub fn succeed(&mut self, created: AdCreated) {
        *self = SubmissionState::Succeeded(created);
    }

    pub fn fail(&mut self, err: &SubmitError) {
        *self = SubmissionState::Failed {
            message: err.user_message(),
        };
    }

    /// Returns a failed submission to idle; other states are left as is.
    pub fn dismiss(&mut self) {
        if matches!(self, SubmissionState::Failed { .. }) {
            *self = SubmissionState::Idle;
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, SubmissionState::Submitting)
    }
}
