//! Paint and replacement state per body panel, submitted alongside the
//! listing as `hasExpertiseInfo` / `expertiseInfo`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpertiseError {
    #[error("`{0}` is not a body part")]
    UnknownPart(String),
    #[error("`{0}` is not a part status")]
    UnknownStatus(String),
    #[error("`{0}` is not a damage type")]
    UnknownDetail(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyPart {
    OnTampon,
    MotorKaputu,
    Tavan,
    SagOnCamurluk,
    SagOnKapi,
    SagArkaKapi,
    SagArkaCamurluk,
    SolOnCamurluk,
    SolOnKapi,
    SolArkaKapi,
    SolArkaCamurluk,
    BagajKapagi,
    ArkaTampon,
}

impl BodyPart {
    pub const ALL: [BodyPart; 13] = [
        BodyPart::OnTampon,
        BodyPart::MotorKaputu,
        BodyPart::Tavan,
        BodyPart::SagOnCamurluk,
        BodyPart::SagOnKapi,
        BodyPart::SagArkaKapi,
        BodyPart::SagArkaCamurluk,
        BodyPart::SolOnCamurluk,
        BodyPart::SolOnKapi,
        BodyPart::SolArkaKapi,
        BodyPart::SolArkaCamurluk,
        BodyPart::BagajKapagi,
        BodyPart::ArkaTampon,
    ];

    pub fn id(self) -> &'static str {
        match self {
            BodyPart::OnTampon => "onTampon",
            BodyPart::MotorKaputu => "motorKaputu",
            BodyPart::Tavan => "tavan",
            BodyPart::SagOnCamurluk => "sagOnCamurluk",
            BodyPart::SagOnKapi => "sagOnKapi",
            BodyPart::SagArkaKapi => "sagArkaKapi",
            BodyPart::SagArkaCamurluk => "sagArkaCamurluk",
            BodyPart::SolOnCamurluk => "solOnCamurluk",
            BodyPart::SolOnKapi => "solOnKapi",
            BodyPart::SolArkaKapi => "solArkaKapi",
            BodyPart::SolArkaCamurluk => "solArkaCamurluk",
            BodyPart::BagajKapagi => "bagajKapagi",
            BodyPart::ArkaTampon => "arkaTampon",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BodyPart::OnTampon => "Ön Tampon",
            BodyPart::MotorKaputu => "Motor Kaputu",
            BodyPart::Tavan => "Tavan",
            BodyPart::SagOnCamurluk => "Sağ Ön Çamurluk",
            BodyPart::SagOnKapi => "Sağ Ön Kapı",
            BodyPart::SagArkaKapi => "Sağ Arka Kapı",
            BodyPart::SagArkaCamurluk => "Sağ Arka Çamurluk",
            BodyPart::SolOnCamurluk => "Sol Ön Çamurluk",
            BodyPart::SolOnKapi => "Sol Ön Kapı",
            BodyPart::SolArkaKapi => "Sol Arka Kapı",
            BodyPart::SolArkaCamurluk => "Sol Arka Çamurluk",
            BodyPart::BagajKapagi => "Bagaj Kapağı",
            BodyPart::ArkaTampon => "Arka Tampon",
        }
    }
}

impl FromStr for BodyPart {
    type Err = ExpertiseError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        BodyPart::ALL
            .into_iter()
            .find(|part| part.id() == id)
            .ok_or_else(|| ExpertiseError::UnknownPart(id.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PartStatus {
    #[serde(rename = "Orijinal")]
    Original,
    #[serde(rename = "Lokal Boyalı")]
    LocallyPainted,
    #[serde(rename = "Boyalı")]
    Painted,
    #[serde(rename = "Değişen")]
    Replaced,
}

impl PartStatus {
    fn color(status: Option<PartStatus>) -> &'static str {
        match status {
            Some(PartStatus::LocallyPainted) => "#FFA500",
            Some(PartStatus::Painted) => "#2196F3",
            Some(PartStatus::Replaced) => "#F44336",
            Some(PartStatus::Original) | None => "#9E9E9E",
        }
    }
}

impl FromStr for PartStatus {
    type Err = ExpertiseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "Orijinal" => Ok(PartStatus::Original),
            "Lokal Boyalı" => Ok(PartStatus::LocallyPainted),
            "Boyalı" => Ok(PartStatus::Painted),
            "Değişen" => Ok(PartStatus::Replaced),
            other => Err(ExpertiseError::UnknownStatus(other.to_string())),
        }
    }
}

pub const DETAIL_TYPES: &[&str] = &[
    "Hafif Çizik",
    "Derin Çizik",
    "Hafif Ezik",
    "Dolu Eziği",
    "Sürtme",
    "Taş İzi",
    "Göçük",
    "Kırık / Çatlak",
    "Yırtık",
    "Çıkmayan Leke – Kuş, Ağaç Pisliği",
    "Renk Solması",
    "Güneş Yanığı",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    /// Derived from the part's status when the detail was recorded.
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartInfo {
    pub status: Option<PartStatus>,
    /// Holds at most one entry; a new detail replaces the old one.
    details: Vec<PartDetail>,
}

impl PartInfo {
    pub fn detail(&self) -> Option<&PartDetail> {
        self.details.first()
    }
}

/// Damage map for the whole body. `clean` is the seller's "no painted or
/// replaced parts" answer; when set, the map is not submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpertiseInfo {
    clean: bool,
    parts: BTreeMap<BodyPart, PartInfo>,
}

impl ExpertiseInfo {
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    pub fn set_clean(&mut self, clean: bool) {
        self.clean = clean;
    }

    pub fn part(&self, part: BodyPart) -> Option<&PartInfo> {
        self.parts.get(&part)
    }

    /// Keeps any recorded detail as it was.
    pub fn set_status(&mut self, part: BodyPart, status: PartStatus) {
        self.parts.entry(part).or_default().status = Some(status);
    }

    pub fn set_detail(
        &mut self,
        part: BodyPart,
        kind: &str,
        description: &str,
    ) -> Result<(), ExpertiseError> {
        if !DETAIL_TYPES.contains(&kind) {
            return Err(ExpertiseError::UnknownDetail(kind.to_string()));
        }
        let info = self.parts.entry(part).or_default();
        info.details = vec![PartDetail {
            kind: kind.to_string(),
            description: description.to_string(),
            color: PartStatus::color(info.status).to_string(),
        }];
        Ok(())
    }

    /// Drops the part's detail but keeps its status. Returns whether a
    /// detail was present.
    pub fn remove_detail(&mut self, part: BodyPart) -> bool {
        match self.parts.get_mut(&part) {
            Some(info) if !info.details.is_empty() => {
                info.details.clear();
                true
            }
            _ => false,
        }
    }

    /// The multipart fields this map contributes, in submission order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("hasExpertiseInfo", self.clean.to_string())];
        if !self.clean {
            let json = serde_json::to_string(&self.parts).unwrap_or_else(|_| "{}".to_string());
            fields.push(("expertiseInfo", json));
        }
        fields
    }
}
