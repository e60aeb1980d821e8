use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::jpeg::JpegEncoder;
use url::Url;

use crate::{core::registration::ProofFile, error::Error};

/// Formats the roster view renders directly; everything else gets
/// re-encoded before storage.
const PASSTHROUGH_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

const JPEG_QUALITY: u8 = 90;

/// Object storage for proof-of-payment files.
///
/// Files land under `<root>/proofs/<epoch-millis>_<normalized-name>.<ext>`
/// and are reachable under the public base URL, which the web layer
/// serves from the same directory. Writes silently overwrite on path
/// reuse; nothing is ever read back through this store.
pub struct ProofStore {
    root: PathBuf,
    public_base: Url,
}

impl ProofStore {
    pub fn new(root: PathBuf, public_base: Url) -> Self {
        ProofStore { root, public_base }
    }

    pub fn proof_dir(&self) -> PathBuf {
        self.root.join("proofs")
    }

    /// Stores one blob and returns its public URL. The path is
    /// namespaced by upload time and the first player's name to keep
    /// concurrent uploads from colliding.
    pub fn store(&self, file: &ProofFile, player_name: &str) -> Result<String, Error> {
        let dir = self.proof_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::UploadFailure(e.to_string()))?;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::UploadFailure(e.to_string()))?
            .as_millis();
        let name = format!(
            "{}_{}.{}",
            millis,
            normalize_player_name(player_name),
            extension_of(file)
        );

        fs::write(dir.join(&name), &file.bytes)
            .map_err(|e| Error::UploadFailure(e.to_string()))?;

        log::info!("Stored proof {} ({} bytes)", name, file.bytes.len());

        Ok(format!(
            "{}/proofs/{}",
            self.public_base.as_str().trim_end_matches('/'),
            name
        ))
    }
}

/// Re-encodes a proof the roster cannot render (anything that is not
/// JPEG, PNG or PDF) as JPEG, renaming it to `.jpg`. Formats the decoder
/// does not know, HEIC among them, surface as an upload failure.
pub fn normalize_proof(file: ProofFile) -> Result<ProofFile, Error> {
    if PASSTHROUGH_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Ok(file);
    }

    let decoded = image::load_from_memory(&file.bytes)
        .map_err(|e| Error::UploadFailure(format!("{}: {}", file.file_name, e)))?;

    let rgb = decoded.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
        .map_err(|e| Error::UploadFailure(e.to_string()))?;

    log::debug!(
        "Re-encoded proof {} ({}) as JPEG",
        file.file_name,
        file.mime_type
    );

    Ok(ProofFile {
        file_name: format!("{}.jpg", stem_of(&file.file_name)),
        mime_type: "image/jpeg".to_owned(),
        bytes,
    })
}

fn normalize_player_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn stem_of(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

fn extension_of(file: &ProofFile) -> &str {
    match file.mime_type.as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "application/pdf" => "pdf",
        _ => match file.file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext,
            _ => "bin",
        },
    }
}
