//! Per-category form descriptors. Each listing form differs only in the data
//! held here.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormProfile {
    pub key: &'static str,
    pub display_name: &'static str,
    /// Category used when the deep link names none.
    pub category_slug: &'static str,
    pub endpoint: &'static str,
    pub video_limit_mb: u64,
    pub numeric_fields: &'static [&'static str],
    pub required_fields: &'static [&'static str],
    pub features: FeatureSet,
}

impl FormProfile {
    pub fn video_limit_bytes(&self) -> u64 {
        self.video_limit_mb * crate::media::MB
    }

    pub fn is_numeric(&self, field: &str) -> bool {
        self.numeric_fields.contains(&field)
    }
}

/// The closed set of checkboxes a form offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSet {
    /// Checked keys serialize into one flat object.
    Flat(&'static [&'static str]),
    /// Each named group serializes into its own nested object.
    Grouped(&'static [(&'static str, &'static [&'static str])]),
}

impl FeatureSet {
    pub fn contains(&self, key: &str) -> bool {
        self.group_of(key).is_some()
    }

    /// `Some(None)` for a key of a flat set, `Some(Some(group))` for a
    /// grouped one.
    pub fn group_of(&self, key: &str) -> Option<Option<&'static str>> {
        match self {
            FeatureSet::Flat(keys) => keys.contains(&key).then_some(None),
            FeatureSet::Grouped(groups) => groups
                .iter()
                .find(|(_, keys)| keys.contains(&key))
                .map(|(group, _)| Some(*group)),
        }
    }

    pub fn keys(&self) -> Vec<&'static str> {
        match self {
            FeatureSet::Flat(keys) => keys.to_vec(),
            FeatureSet::Grouped(groups) => groups
                .iter()
                .flat_map(|(_, keys)| keys.iter().copied())
                .collect(),
        }
    }
}

const MINIBUS_FEATURES: &[&str] = &[
    "abs",
    "alarm",
    "alasimJant",
    "asr",
    "cdCalar",
    "cekiDemiri",
    "deriDoseme",
    "elektrikliAynalar",
    "elektrikliCam",
    "esp",
    "farSis",
    "farSensoru",
    "farYikamaSistemi",
    "havaYastigi",
    "havaYastigiYolcu",
    "hizSabitleme",
    "hidrolikDireksiyon",
    "immobilizer",
    "isitmalKoltuklar",
    "klima",
    "merkeziKilit",
    "okulAraci",
    "otomatikCam",
    "otomatikKapi",
    "parkSensoru",
    "radioTeyp",
    "spoyler",
    "sunroof",
    "turizmPaketi",
    "tvNavigasyon",
    "xenonFar",
    "yagmurSensoru",
    "yanHavaYastigi",
    "yokusKalkisDestegi",
    "yolBilgisayari",
    "sogutucuFrigo",
    "dvdPlayer",
    "muzikSistemi",
    "geriGorusKamerasi",
    "elFreni",
    "ayakFreni",
    "bagajHacmi",
    "sigortali",
    "garantili",
];

const MINIVAN_SAFETY: &[&str] = &[
    "ABS",
    "AEB",
    "BAS",
    "Çocuk Kilidi",
    "Distronic",
    "ESP / VSA",
    "Gece Görüş Sistemi",
    "Hava Yastığı (Sürücü)",
    "Hava Yastığı (Yolcu)",
    "Immobilizer",
    "Isofix",
    "Kor Nokta Uyarı Sistemi",
    "Merkezi Kilit",
    "Şerit Takip Sistemi",
    "Yokuş Kalkış Desteği",
    "Yorgunluk Tespit Sistemi",
];

const MINIVAN_INTERIOR: &[&str] = &[
    "Anahtar Giriş ve Çalıştırma",
    "Deri Koltuk",
    "Elektrikli Camlar",
    "Elektrikli Koltuklar",
    "Fonksiyonel Direksiyon",
    "Geri Görüş Kamerası",
    "Head-up Display",
    "Hız Sabiteme Sistemi",
    "Hidrolik Direksiyon",
    "İstimlaj Direksiyon",
    "Klima",
    "Koltuklar (Elektrikli)",
    "Koltuklar (Hafızalı)",
    "Koltuklar (Isıtmalı)",
    "Koltuklar (Soğutmalı)",
    "Kumaş Koltuk",
    "Otm.Kararan Dikiz Aynası",
    "Ön Görüş Kamerası",
    "Ön Koltuk Kol Dayaması",
    "Soğutmalı Torpido",
    "Start / Stop",
    "Yol Bilgisayarı",
];

const MINIVAN_EXTERIOR: &[&str] = &[
    "Akıllı Bagaj Kapağı",
    "Ayakla Açılan Bagaj Kapağı",
    "Aynalar (Elektrikli)",
    "Aynalar (Hafızalı)",
    "Aynalar (Isıtmalı)",
    "Elektrikli Aynalar",
    "Far (Adaptif)",
    "Otomatik Kapı",
    "Panoramik Cam Tavan",
    "Park Asistanı",
    "Park Sensörü",
    "Park Sensörü (Arka)",
    "Park Sensörü (Ön)",
    "Romork Çeki Demiri",
    "Sunroof",
    "Sürgülü Kapı (Çift)",
    "Sürgülü Kapı (Tek)",
];

const MINIVAN_MULTIMEDIA: &[&str] = &["Android Auto", "Apple CarPlay", "Bluetooth", "USB / AUX"];

const MINIVAN_FEATURES: &[(&str, &[&str])] = &[
    ("safetyFeatures", MINIVAN_SAFETY),
    ("interiorFeatures", MINIVAN_INTERIOR),
    ("exteriorFeatures", MINIVAN_EXTERIOR),
    ("multimediaFeatures", MINIVAN_MULTIMEDIA),
];

const TOW_TRUCK_FEATURES: &[&str] = &[
    "hidrolikDireksiyon",
    "abs",
    "havaYastigi",
    "tepeLambasi",
    "takograf",
    "havaliFreni",
    "motorFreni",
    "alarm",
    "merkeziKilit",
    "gps",
    "vinc",
    "kaldirmaPlatformu",
    "hidrolikSistem",
    "uzaktanKumanda",
];

const TRUCK_FEATURES: &[&str] = &[
    "abs",
    "asr",
    "esp",
    "ebs",
    "klima",
    "airCondition",
    "webasto",
    "buzdolabi",
    "radyoTeyp",
    "cdCalar",
    "navigasyon",
    "bluetooth",
    "geriGorusKamerasi",
    "korna",
    "alarm",
    "immobilizer",
    "merkeziKilit",
    "elektrikliCam",
    "elektrikliAyna",
    "hidrolikDireksiyon",
    "tempomat",
    "retarder",
    "diferansielKilidi",
    "yakit",
    "adBlue",
    "yakitTankHacmi",
    "lastikEbadi",
    "jantTipi",
    "alasimJant",
    "celikJant",
    "farTipi",
    "xenonFar",
    "ledFar",
    "sisLambasi",
    "strobon",
    "takograf",
    "frenTipi",
    "diskFren",
    "tambur",
    "motorFreni",
];

const BUS_FEATURES: &[&str] = &[
    "3G",
    "ABS",
    "Araç Telefonu",
    "ASR",
    "Buzdolabı",
    "Klima",
    "Mutfak",
    "Retarder",
    "Sürücü Kabini",
    "Televizyon",
    "Tuvalet",
    "Uydu",
    "Wi-Fi",
];

const BASE_NUMERIC: &[&str] = &["price", "mileage", "tramerAmount"];

const BASE_REQUIRED: &[&str] = &["title", "year", "price"];

pub static PROFILES: [FormProfile; 5] = [
    FormProfile {
        key: "minibus",
        display_name: "Minibüs & Midibüs",
        category_slug: "minibus-midibus",
        endpoint: "/ads/minibus",
        video_limit_mb: 50,
        numeric_fields: &["price", "mileage", "tramerAmount", "seatCount"],
        required_fields: BASE_REQUIRED,
        features: FeatureSet::Flat(MINIBUS_FEATURES),
    },
    FormProfile {
        key: "minivan-panelvan",
        display_name: "Minivan & Panelvan",
        category_slug: "minivan-panelvan",
        endpoint: "/ads/minivan-panelvan",
        video_limit_mb: 50,
        numeric_fields: &["price", "mileage", "tramerAmount", "engineVolume", "motorPower"],
        required_fields: BASE_REQUIRED,
        features: FeatureSet::Grouped(MINIVAN_FEATURES),
    },
    FormProfile {
        key: "oto-kurtarici",
        display_name: "Oto Kurtarıcı & Taşıyıcı",
        category_slug: "oto-kurtarici-tasiyici",
        endpoint: "/ads/oto-kurtarici",
        video_limit_mb: 100,
        numeric_fields: &["price", "mileage", "tramerAmount", "maxVehicleCapacity", "loadCapacity"],
        required_fields: BASE_REQUIRED,
        features: FeatureSet::Flat(TOW_TRUCK_FEATURES),
    },
    FormProfile {
        key: "kamyon",
        display_name: "Kamyon & Kamyonet",
        category_slug: "kamyon-kamyonet",
        endpoint: "/ads/kamyon",
        video_limit_mb: 100,
        numeric_fields: &["price", "mileage", "tramerAmount", "loadCapacity"],
        required_fields: BASE_REQUIRED,
        features: FeatureSet::Flat(TRUCK_FEATURES),
    },
    FormProfile {
        key: "otobus",
        display_name: "Otobüs",
        category_slug: "otobus",
        endpoint: "/ads/otobus",
        video_limit_mb: 50,
        numeric_fields: BASE_NUMERIC,
        required_fields: BASE_REQUIRED,
        features: FeatureSet::Flat(BUS_FEATURES),
    },
];

pub fn profile_for(key: &str) -> Option<&'static FormProfile> {
    PROFILES.iter().find(|profile| profile.key == key)
}
