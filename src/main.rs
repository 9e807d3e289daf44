use eyre::{Result, WrapErr, eyre};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};
use trucksbus_listing::expertise::{BodyPart, PartStatus};
use trucksbus_listing::media::MediaFile;
use trucksbus_listing::submission::Currency;
use trucksbus_listing::{AdFormSession, Collaborators, DeepLink, Navigation, profile_for};

/// A listing prepared offline, submitted headlessly.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Draft {
    form: String,
    /// Create-ad URL path such as `/create-ad/minibus-midibus/mercedes`;
    /// takes precedence over `link`.
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    link: DeepLink,
    #[serde(default)]
    brand_id: Option<String>,
    #[serde(default)]
    model_id: Option<String>,
    #[serde(default)]
    variant_id: Option<String>,
    city_id: String,
    district_id: String,
    #[serde(default)]
    fields: BTreeMap<String, String>,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    currency: Option<String>,
    /// "No painted or replaced parts".
    #[serde(default)]
    body_clean: bool,
    /// Body part id to its damage record.
    #[serde(default)]
    expertise: BTreeMap<String, DraftPart>,
    showcase: PathBuf,
    #[serde(default)]
    photos: Vec<PathBuf>,
    #[serde(default)]
    videos: Vec<PathBuf>,
    #[serde(default)]
    expertise_report: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct DraftPart {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    description: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| eyre!("usage: trucksbus-listing <draft.json>"))?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .wrap_err_with(|| format!("reading {path}"))?;
    let draft: Draft = serde_json::from_str(&raw).wrap_err("invalid draft")?;

    if let Err(err) = run(draft).await {
        error!(target = "trucksbus.cli", "submission failed: {err}");
        return Err(err);
    }
    Ok(())
}

async fn run(draft: Draft) -> Result<()> {
    let profile =
        profile_for(&draft.form).ok_or_else(|| eyre!("unknown form `{}`", draft.form))?;
    let mut session = AdFormSession::new(profile, Collaborators::live());
    let link = match draft.path.as_deref() {
        Some(path) => DeepLink::from_path(path, "create-ad"),
        None => draft.link.clone(),
    };
    session.mount(&link).await;

    if let Some(brand) = draft.brand_id.as_deref() {
        session.choose_brand(Some(brand))?;
        session.settle().await;
    }
    if let Some(model) = draft.model_id.as_deref() {
        session.choose_model(Some(model))?;
        session.settle().await;
    }
    if let Some(variant) = draft.variant_id.as_deref() {
        session.choose_variant(Some(variant))?;
    }
    session.choose_city(Some(&draft.city_id))?;
    session.settle().await;
    session.choose_district(Some(&draft.district_id))?;

    for (name, value) in &draft.fields {
        session.set_field(name, value);
    }
    for key in &draft.features {
        session.set_feature(key, true)?;
    }
    if let Some(currency) = draft.currency.as_deref() {
        session.set_currency(currency.parse::<Currency>().map_err(|e| eyre!(e))?);
    }
    session.set_body_clean(draft.body_clean);
    for (id, part) in &draft.expertise {
        let body_part: BodyPart = id.parse()?;
        if let Some(status) = part.status.as_deref() {
            session.set_part_status(body_part, status.parse::<PartStatus>()?);
        }
        if let Some(kind) = part.detail.as_deref() {
            session.set_part_detail(body_part, kind, &part.description)?;
        }
    }

    session.set_showcase(MediaFile::from_path(&draft.showcase).await?);
    let mut photos = Vec::with_capacity(draft.photos.len());
    for path in &draft.photos {
        photos.push(MediaFile::from_path(path).await?);
    }
    session.add_photos(photos)?;
    let mut videos = Vec::with_capacity(draft.videos.len());
    for path in &draft.videos {
        videos.push(MediaFile::from_path(path).await?);
    }
    session.add_videos(videos)?;
    if let Some(report) = &draft.expertise_report {
        session.set_report(MediaFile::from_path(report).await?)?;
    }

    match session.submit().await {
        Ok(created) => {
            info!(target = "trucksbus.cli", id = ?created.id, "listing created");
            let next = session
                .finish()
                .map_err(|_| eyre!("session not finished after success"))?;
            println!(
                "{}",
                serde_json::json!({
                    "id": created.id,
                    "message": created.message,
                    "next": format!("{next:?}"),
                })
            );
            Ok(())
        }
        Err(err) => {
            if err.navigation() == Some(Navigation::Login) {
                return Err(eyre!("{} (set ACCESS_TOKEN)", err.user_message()));
            }
            Err(eyre!(err.user_message()))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
