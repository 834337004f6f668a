//! Intake checks for candidate audio files.
//!
//! A file is accepted when it is at most [`MAX_FILE_SIZE`] bytes and either its
//! declared media type or its extension is on the allow-list. Size is checked
//! first.

use bytes::Bytes;

use crate::error::Rejection;

/// Largest accepted upload, inclusive.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Files above this size get a heads-up notice on acceptance.
const LARGE_FILE_SIZE: u64 = 25 * 1024 * 1024;

const ALLOWED_TYPES: &[&str] = &[
    "audio/wav",
    "audio/mpeg",
    "audio/mp3",
    "audio/ogg",
    "audio/flac",
];
const ALLOWED_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "flac"];

/// Linear processing-time model.
const SECONDS_PER_MIB: f64 = 3.0;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// A file as handed over by a picker or drop surface.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    /// Declared media type; may be empty or wrong.
    pub media_type: String,
    pub data: Bytes,
}

impl RawFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lowercased text after the last `.`, if the name has one.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    /// Declared media type without parameters, lowercased.
    fn essence(&self) -> String {
        self.media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }
}

/// A file that passed intake. Immutable; cloning shares the payload.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    raw: RawFile,
}

impl CandidateFile {
    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn media_type(&self) -> &str {
        &self.raw.media_type
    }

    pub fn size(&self) -> u64 {
        self.raw.size()
    }

    pub fn size_mib(&self) -> f64 {
        mib(self.size())
    }

    pub fn data(&self) -> &Bytes {
        &self.raw.data
    }

    /// Name up to the first `.`, used to derive the download name.
    pub fn stem(&self) -> &str {
        self.raw.name.split('.').next().unwrap_or_default()
    }

    /// Media type to attach to the original preview: the declared type when it
    /// is usable, otherwise one inferred from the extension.
    pub fn preview_type(&self) -> String {
        let essence = self.raw.essence();
        if ALLOWED_TYPES.contains(&essence.as_str()) {
            return essence;
        }
        match self.raw.extension().as_deref() {
            Some("mp3") => "audio/mpeg".to_string(),
            Some(ext @ ("wav" | "ogg" | "flac")) => format!("audio/{ext}"),
            _ => "application/octet-stream".to_string(),
        }
    }
}

/// Run the intake rules, first failure wins.
pub fn validate(file: RawFile) -> Result<CandidateFile, Rejection> {
    if file.size() > MAX_FILE_SIZE {
        return Err(Rejection::TooLarge {
            size_mib: mib(file.size()),
        });
    }

    let type_ok = ALLOWED_TYPES.contains(&file.essence().as_str());
    let ext_ok = file
        .extension()
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
    if !type_ok && !ext_ok {
        return Err(Rejection::UnsupportedType);
    }

    Ok(CandidateFile { raw: file })
}

/// Advisory processing-time estimate for a file of `size` bytes.
pub fn estimate_duration(size: u64) -> String {
    let seconds = (mib(size) * SECONDS_PER_MIB).ceil() as u64;
    if seconds < 5 {
        return "a few seconds".to_string();
    }
    if seconds < 60 {
        return format!("{seconds} seconds");
    }
    let minutes = seconds.div_ceil(60);
    if minutes > 1 {
        format!("{minutes} minutes")
    } else {
        format!("{minutes} minute")
    }
}

/// Notice shown when accepting an unusually large file.
pub fn large_file_notice(file: &CandidateFile, estimate: &str) -> Option<String> {
    (file.size() > LARGE_FILE_SIZE).then(|| {
        format!(
            "Large file detected ({:.1} MB). Processing may take {estimate}.",
            file.size_mib()
        )
    })
}

fn mib(size: u64) -> f64 {
    size as f64 / BYTES_PER_MIB
}
