use std::fmt;
use std::str::FromStr;

/// Timezone prefixes of regions whose mains grid runs at 60 Hz.
const HZ60_REGIONS: &[&str] = &[
    "America/",
    "US/",
    "Canada/",
    "Mexico/",
    "Brazil/",
    "Colombia/",
    "Venezuela/",
    "Asia/Tokyo",
    "Asia/Seoul",
    "Asia/Taipei",
    "Asia/Manila",
    "Asia/Riyadh",
    "Asia/Kuwait",
    "Pacific/Guam",
    "Pacific/Saipan",
];

/// Which hum frequency the transform should remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyMode {
    /// Let the server pick, helped by the analysis result.
    #[default]
    Auto,
    Hz50,
    Hz60,
}

impl FrequencyMode {
    /// Value of the `humFrequency` form field.
    pub fn form_value(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Hz50 => "50",
            Self::Hz60 => "60",
        }
    }

    pub fn hz(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Hz50 => Some(50),
            Self::Hz60 => Some(60),
        }
    }
}

impl fmt::Display for FrequencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hz() {
            Some(hz) => write!(f, "{hz} Hz"),
            None => f.write_str("auto"),
        }
    }
}

impl FromStr for FrequencyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.trim_end_matches("hz").trim() {
            "auto" => Ok(Self::Auto),
            "50" => Ok(Self::Hz50),
            "60" => Ok(Self::Hz60),
            _ => Err(format!("unknown hum frequency '{s}' (expected auto, 50 or 60)")),
        }
    }
}

/// Likely mains frequency for an IANA timezone name. Display hint only.
pub fn regional_default(timezone: &str) -> FrequencyMode {
    if HZ60_REGIONS.iter().any(|region| timezone.starts_with(region)) {
        FrequencyMode::Hz60
    } else {
        FrequencyMode::Hz50
    }
}
