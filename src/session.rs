//! One listing form from mount to successful submission.

use crate::catalog::{Catalog, CatalogClient};
use crate::config::{AUTO_SELECT_FIRST, CATALOG_FETCH_TIMEOUT};
use crate::expertise::{BodyPart, ExpertiseError, ExpertiseInfo, PartStatus};
use crate::lightbox::{DetachedKeyboard, Key, KeyboardHost, VideoLightbox};
use crate::media::{BlobPreviews, MediaError, MediaFile, MediaStager, PreviewBackend};
use crate::models::DeepLink;
use crate::profile::FormProfile;
use crate::resolver::{
    Applied, AutoSelect, DeepLinkSeeder, ResolveError, ResolverDriver, SelectionResolver,
};
use crate::submission::auth::valid_token;
use crate::submission::{
    AdCreated, AdPublisher, AdsClient, Currency, EnvTokenStore, FeatureError, FeatureFlags, FormFields,
    SubmissionInput, SubmissionPayload, SubmissionState, SubmitError, TokenStore,
    ValidationError, assemble, format_thousands,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Where the host should send the seller next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Login,
    Dashboard,
}

impl SubmitError {
    pub fn navigation(&self) -> Option<Navigation> {
        match self {
            SubmitError::SessionExpired => Some(Navigation::Login),
            _ => None,
        }
    }
}

/// External services a session talks to.
pub struct Collaborators {
    pub catalog: Arc<dyn Catalog>,
    pub publisher: Arc<dyn AdPublisher>,
    pub tokens: Arc<dyn TokenStore>,
    pub previews: Arc<dyn PreviewBackend>,
    pub keyboard: Arc<dyn KeyboardHost>,
    pub auto_select: AutoSelect,
    pub fetch_timeout: Option<Duration>,
}

impl Collaborators {
    /// HTTP-backed catalog and publisher configured from the environment.
    pub fn live() -> Self {
        Self {
            catalog: Arc::new(CatalogClient::from_env()),
            publisher: Arc::new(AdsClient::from_env()),
            tokens: Arc::new(EnvTokenStore::default()),
            previews: Arc::new(BlobPreviews::new()),
            keyboard: Arc::new(DetachedKeyboard::default()),
            auto_select: AutoSelect::from_flag(*AUTO_SELECT_FIRST),
            fetch_timeout: *CATALOG_FETCH_TIMEOUT,
        }
    }
}

pub struct AdFormSession {
    profile: &'static FormProfile,
    driver: ResolverDriver,
    seeder: DeepLinkSeeder,
    media: MediaStager,
    lightbox: VideoLightbox,
    features: FeatureFlags,
    expertise: ExpertiseInfo,
    fields: FormFields,
    currency: Currency,
    state: SubmissionState,
    publisher: Arc<dyn AdPublisher>,
    tokens: Arc<dyn TokenStore>,
}

impl AdFormSession {
    pub fn new(profile: &'static FormProfile, parts: Collaborators) -> Self {
        Self {
            profile,
            driver: ResolverDriver::new(parts.catalog, parts.auto_select)
                .with_timeout(parts.fetch_timeout),
            seeder: DeepLinkSeeder::new(),
            media: MediaStager::new(parts.previews, profile.video_limit_bytes()),
            lightbox: VideoLightbox::new(parts.keyboard),
            features: FeatureFlags::new(profile.features),
            expertise: ExpertiseInfo::default(),
            fields: FormFields::default(),
            currency: Currency::default(),
            state: SubmissionState::Idle,
            publisher: parts.publisher,
            tokens: parts.tokens,
        }
    }

    pub fn profile(&self) -> &'static FormProfile {
        self.profile
    }

    /// Seeds the taxonomy from `link`, loads cities and waits for every
    /// resulting fetch.
    pub async fn mount(&mut self, link: &DeepLink) {
        self.seeder
            .seed(&mut self.driver, link, self.profile.category_slug)
            .await;
        self.driver.load_cities();
        self.driver.settle().await;
        info!(
            target = "trucksbus.session",
            form = self.profile.key,
            stage = ?self.driver.resolver().stage(),
            "mounted"
        );
    }

    pub fn resolver(&self) -> &SelectionResolver {
        self.driver.resolver()
    }

    pub async fn pump(&mut self) -> Option<Applied> {
        self.driver.pump().await
    }

    pub async fn settle(&mut self) {
        self.driver.settle().await;
    }

    pub fn choose_brand(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        self.driver.choose_brand(id)
    }

    pub fn choose_model(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        self.driver.choose_model(id)
    }

    pub fn choose_variant(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        self.driver.choose_variant(id)
    }

    pub fn choose_city(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        self.driver.choose_city(id)
    }

    pub fn choose_district(&mut self, id: Option<&str>) -> Result<(), ResolveError> {
        self.driver.choose_district(id)
    }

    pub fn set_field(&mut self, name: &str, value: &str) {
        self.fields.set(name, value);
    }

    /// Field value as shown in the form; numeric fields are digit-grouped.
    pub fn display_field(&self, name: &str) -> Option<String> {
        let value = self.fields.get(name)?;
        if self.profile.is_numeric(name) {
            Some(format_thousands(value))
        } else {
            Some(value.to_string())
        }
    }

    pub fn set_feature(&mut self, key: &str, on: bool) -> Result<(), FeatureError> {
        self.features.set(key, on)
    }

    pub fn toggle_feature(&mut self, key: &str) -> Result<bool, FeatureError> {
        self.features.toggle(key)
    }

    pub fn set_currency(&mut self, currency: Currency) {
        self.currency = currency;
    }

    pub fn expertise(&self) -> &ExpertiseInfo {
        &self.expertise
    }

    /// "No painted or replaced parts"; the part map is kept but not sent.
    pub fn set_body_clean(&mut self, clean: bool) {
        self.expertise.set_clean(clean);
    }

    pub fn set_part_status(&mut self, part: BodyPart, status: PartStatus) {
        self.expertise.set_status(part, status);
    }

    pub fn set_part_detail(
        &mut self,
        part: BodyPart,
        kind: &str,
        description: &str,
    ) -> Result<(), ExpertiseError> {
        self.expertise.set_detail(part, kind, description)
    }

    pub fn remove_part_detail(&mut self, part: BodyPart) -> bool {
        self.expertise.remove_detail(part)
    }

    pub fn media(&self) -> &MediaStager {
        &self.media
    }

    pub fn set_showcase(&mut self, file: MediaFile) -> String {
        self.media.set_showcase(file).to_string()
    }

    pub fn clear_showcase(&mut self) {
        self.media.clear_showcase();
    }

    pub fn add_photos(&mut self, files: Vec<MediaFile>) -> Result<(), MediaError> {
        self.media.add_photos(files)
    }

    pub fn remove_photo(&mut self, index: usize) -> bool {
        self.media.remove_photo(index)
    }

    pub fn add_videos(&mut self, files: Vec<MediaFile>) -> Result<(), MediaError> {
        self.media.add_videos(files)?;
        self.lightbox.sync(self.media.videos().len());
        Ok(())
    }

    pub fn remove_video(&mut self, index: usize) -> bool {
        let removed = self.media.remove_video(index);
        self.lightbox.sync(self.media.videos().len());
        removed
    }

    pub fn set_report(&mut self, file: MediaFile) -> Result<String, MediaError> {
        self.media.set_report(file).map(str::to_string)
    }

    pub fn remove_report(&mut self) {
        self.media.remove_report();
    }

    pub fn lightbox(&self) -> &VideoLightbox {
        &self.lightbox
    }

    pub fn open_video(&mut self, index: usize) {
        self.lightbox.open(index, self.media.videos().len());
    }

    pub fn close_video(&mut self) {
        self.lightbox.close();
    }

    pub fn lightbox_key(&mut self, key: Key) -> bool {
        self.lightbox.handle_key(key)
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Builds the payload without sending it.
    pub fn payload(&self) -> Result<SubmissionPayload, ValidationError> {
        let selection = self.driver.resolver().selection();
        let slugs = self.driver.resolver().slugs();
        assemble(&SubmissionInput {
            profile: self.profile,
            fields: &self.fields,
            currency: self.currency,
            features: &self.features,
            expertise: &self.expertise,
            selection: &selection,
            slugs: &slugs,
            media: &self.media,
        })
    }

    /// Validates and sends the listing. Validation and missing credentials
    /// leave the state as it was; server and transport failures move it to
    /// `Failed` so the seller can retry.
    pub async fn submit(&mut self) -> Result<AdCreated, SubmitError> {
        let previous = self.state.clone();
        self.state.begin()?;

        let outcome = self.send().await;
        match &outcome {
            Ok(created) => {
                info!(target = "trucksbus.session", form = self.profile.key, id = ?created.id, "listing created");
                self.state.succeed(created.clone());
            }
            Err(SubmitError::Validation(_)) => self.state = previous,
            Err(SubmitError::SessionExpired) => {
                warn!(target = "trucksbus.session", "session expired during submission");
                self.tokens.clear();
                self.state = previous;
            }
            Err(err) => self.state.fail(err),
        }
        outcome
    }

    async fn send(&self) -> Result<AdCreated, SubmitError> {
        let payload = self.payload()?;
        let token = valid_token(self.tokens.as_ref())?;
        self.publisher
            .create_ad(self.profile.endpoint, payload, &token)
            .await
    }

    pub fn dismiss_error(&mut self) {
        self.state.dismiss();
    }

    /// Consumes the session after a successful submission. Staged media and
    /// their previews are released with it.
    pub fn finish(self) -> Result<Navigation, Box<Self>> {
        match self.state {
            SubmissionState::Succeeded(_) => Ok(Navigation::Dashboard),
            _ => Err(Box::new(self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::FakeCatalog;
    use crate::profile::profile_for;
    use crate::submission::MemoryTokenStore;
    use crate::submission::ads::fake::RecordingPublisher;

    struct Harness {
        session: AdFormSession,
        publisher: Arc<RecordingPublisher>,
        tokens: Arc<MemoryTokenStore>,
        previews: Arc<BlobPreviews>,
        keyboard: Arc<DetachedKeyboard>,
    }

    fn harness(publisher: RecordingPublisher, token: Option<&str>) -> Harness {
        let catalog = FakeCatalog::default()
            .with_category("10", "minibus-midibus")
            .with_brands("minibus-midibus", &[("1", "mercedes"), ("2", "ford")])
            .with_models("minibus-midibus", "mercedes", &[("11", "vito"), ("12", "sprinter")])
            .with_variants("minibus-midibus", "mercedes", "sprinter", &[("121", "316-cdi")])
            .with_cities(&[("34", "Istanbul")])
            .with_districts("34", &[("7", "Kadikoy")]);
        let publisher = Arc::new(publisher);
        let tokens = Arc::new(MemoryTokenStore::new(token.map(str::to_string)));
        let previews = Arc::new(BlobPreviews::new());
        let keyboard = Arc::new(DetachedKeyboard::default());
        let session = AdFormSession::new(
            profile_for("minibus").unwrap(),
            Collaborators {
                catalog: Arc::new(catalog),
                publisher: publisher.clone(),
                tokens: tokens.clone(),
                previews: previews.clone(),
                keyboard: keyboard.clone(),
                auto_select: AutoSelect::FirstWhenEmpty,
                fetch_timeout: None,
            },
        );
        Harness {
            session,
            publisher,
            tokens,
            previews,
            keyboard,
        }
    }

    async fn filled(h: &mut Harness) {
        let link = DeepLink::new(None, Some("mercedes"), Some("sprinter"), None);
        h.session.mount(&link).await;
        h.session.choose_city(Some("34")).unwrap();
        h.session.settle().await;
        h.session.choose_district(Some("7")).unwrap();
        h.session.set_field("title", "Temiz Sprinter");
        h.session.set_field("year", "2019");
        h.session.set_field("price", "1250000");
        h.session.set_showcase(MediaFile::from_bytes("cover.jpg", "image/jpeg", vec![1]));
    }

    #[tokio::test]
    async fn deep_linked_form_submits_and_finishes_on_dashboard() {
        let mut h = harness(RecordingPublisher::default(), Some("opaque-token"));
        filled(&mut h).await;
        assert_eq!(h.session.resolver().selection().model_id.as_deref(), Some("12"));
        assert_eq!(h.session.resolver().selection().variant_id, None);
        assert_eq!(h.session.display_field("price").as_deref(), Some("1.250.000"));

        let created = h.session.submit().await.unwrap();
        assert_eq!(created.id.as_deref(), Some("1001"));
        assert_eq!(h.publisher.sent(), 1);
        {
            let sent = h.publisher.sent.lock().unwrap();
            let (endpoint, payload, token) = &sent[0];
            assert_eq!(endpoint, "/ads/minibus");
            assert_eq!(token, "opaque-token");
            assert_eq!(payload.field("modelSlug"), Some("sprinter"));
            assert_eq!(payload.attachment_names(), vec!["showcasePhoto"]);
        }

        assert!(matches!(h.session.submit().await, Err(SubmitError::Busy)));
        assert_eq!(h.session.finish().ok(), Some(Navigation::Dashboard));
        assert_eq!(h.previews.live(), 0);
    }

    #[tokio::test]
    async fn damage_map_and_currency_reach_the_payload() {
        let mut h = harness(RecordingPublisher::default(), Some("opaque-token"));
        filled(&mut h).await;
        h.session.set_currency(Currency::Eur);
        h.session.set_part_status(BodyPart::OnTampon, PartStatus::LocallyPainted);
        h.session
            .set_part_detail(BodyPart::OnTampon, "Taş İzi", "")
            .unwrap();
        assert!(h.session.set_part_detail(BodyPart::OnTampon, "Pas", "").is_err());

        h.session.submit().await.unwrap();
        let sent = h.publisher.sent.lock().unwrap();
        let (_, payload, _) = &sent[0];
        assert_eq!(payload.field("currency"), Some("EUR"));
        assert_eq!(payload.field("hasExpertiseInfo"), Some("false"));
        let info: serde_json::Value =
            serde_json::from_str(payload.field("expertiseInfo").unwrap()).unwrap();
        assert_eq!(info["onTampon"]["status"], "Lokal Boyalı");
        assert_eq!(info["onTampon"]["details"][0]["type"], "Taş İzi");
        assert_eq!(info["onTampon"]["details"][0]["color"], "#FFA500");
    }

    #[tokio::test]
    async fn missing_token_sends_nothing_and_points_to_login() {
        let mut h = harness(RecordingPublisher::default(), None);
        filled(&mut h).await;
        let err = h.session.submit().await.unwrap_err();
        assert_eq!(err.navigation(), Some(Navigation::Login));
        assert_eq!(h.publisher.sent(), 0);
        assert_eq!(h.session.state(), &SubmissionState::Idle);
        assert!(h.session.media().has_showcase());
    }

    #[tokio::test]
    async fn unauthorized_response_clears_token() {
        let publisher = RecordingPublisher::default().respond(Err(SubmitError::SessionExpired));
        let mut h = harness(publisher, Some("opaque-token"));
        filled(&mut h).await;
        let err = h.session.submit().await.unwrap_err();
        assert_eq!(err, SubmitError::SessionExpired);
        assert_eq!(h.tokens.get(), None);
    }

    #[tokio::test]
    async fn rejected_submission_can_be_retried() {
        let publisher = RecordingPublisher::default().respond(Err(SubmitError::Rejected {
            status: 400,
            message: Some("Fiyat geçersiz".into()),
        }));
        let mut h = harness(publisher, Some("opaque-token"));
        filled(&mut h).await;

        assert!(h.session.submit().await.is_err());
        assert_eq!(
            h.session.state(),
            &SubmissionState::Failed {
                message: "Fiyat geçersiz".into()
            }
        );
        assert!(h.session.media().has_showcase());

        h.session.submit().await.unwrap();
        assert_eq!(h.publisher.sent(), 2);
    }

    #[tokio::test]
    async fn validation_failure_keeps_state_idle() {
        let mut h = harness(RecordingPublisher::default(), Some("opaque-token"));
        filled(&mut h).await;
        h.session.clear_showcase();
        let err = h.session.submit().await.unwrap_err();
        assert_eq!(err, SubmitError::Validation(ValidationError::MissingShowcase));
        assert_eq!(h.session.state(), &SubmissionState::Idle);
        assert_eq!(h.publisher.sent(), 0);
        assert!(h.session.finish().is_err());
    }

    #[tokio::test]
    async fn lightbox_follows_video_removal() {
        let mut h = harness(RecordingPublisher::default(), Some("opaque-token"));
        let videos = (0..2)
            .map(|i| MediaFile::from_bytes(format!("{i}.mp4"), "video/mp4", vec![0]))
            .collect();
        h.session.add_videos(videos).unwrap();
        h.session.open_video(1);
        assert_eq!(h.keyboard.live_bindings(), 1);
        h.session.remove_video(1);
        assert_eq!(h.session.lightbox().index(), 0);
        h.session.remove_video(0);
        assert!(!h.session.lightbox().is_open());
        assert_eq!(h.keyboard.live_bindings(), 0);
    }
}
