use std::fmt;
use std::path::Path;

/// Containers the splitter accepts as input.
///
/// Output parts always use the same container as the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    M4a,
    M4b,
    Aac,
    Mp3,
    Ogg,
    Opus,
    Wav,
    Flac,
}

impl AudioFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        Self::from_extension(extension)
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let format = match extension.to_ascii_lowercase().as_str() {
            "m4a" => AudioFormat::M4a,
            "m4b" => AudioFormat::M4b,
            "aac" => AudioFormat::Aac,
            "mp3" => AudioFormat::Mp3,
            "ogg" => AudioFormat::Ogg,
            "opus" => AudioFormat::Opus,
            "wav" => AudioFormat::Wav,
            "flac" => AudioFormat::Flac,
            _ => return None,
        };
        Some(format)
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::M4a => "m4a",
            AudioFormat::M4b => "m4b",
            AudioFormat::Aac => "aac",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }

    /// Encoder used when re-encoding at a target bitrate.
    ///
    /// Lossless containers return `None`: their parts are always stream copies.
    pub fn lossy_codec(self) -> Option<&'static str> {
        match self {
            AudioFormat::M4a | AudioFormat::M4b | AudioFormat::Aac => Some("aac"),
            AudioFormat::Mp3 => Some("libmp3lame"),
            AudioFormat::Ogg | AudioFormat::Opus => Some("libopus"),
            AudioFormat::Wav | AudioFormat::Flac => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
