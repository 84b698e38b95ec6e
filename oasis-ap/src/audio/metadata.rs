//! Tag metadata extraction from symphonia metadata revisions

use crate::audio::types::AudioMetadata;
use symphonia::core::meta::{MetadataRevision, StandardTagKey};

/// Collect title, artists, album and cover art size from one revision.
///
/// Artist tags may repeat; each distinct value is kept in order.
pub fn read_tags(revision: &MetadataRevision) -> AudioMetadata {
    let mut metadata = AudioMetadata::default();

    for tag in revision.tags() {
        let value = tag.value.to_string();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match tag.std_key {
            Some(StandardTagKey::TrackTitle) if metadata.title.is_none() => {
                metadata.title = Some(value.to_string());
            }
            Some(StandardTagKey::Album) if metadata.album.is_none() => {
                metadata.album = Some(value.to_string());
            }
            Some(StandardTagKey::Artist) | Some(StandardTagKey::AlbumArtist) => {
                if !metadata.artists.iter().any(|a| a == value) {
                    metadata.artists.push(value.to_string());
                }
            }
            _ => {}
        }
    }

    metadata.cover_art_bytes = revision.visuals().first().map(|v| v.data.len());
    metadata
}
