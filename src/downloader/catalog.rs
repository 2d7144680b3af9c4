// Catalog - normalizes platform-reported formats into the advertised list
//
// Handles:
// - Dropping records without a usable track or in an unusable container
// - First-wins dedup per quality label
// - Rewriting ambiguous / duplicate ids so every id is unique
// - Padding the video ladder with placeholders for unreported heights
//
// Pure transform: the same input always yields the same catalog.

use std::collections::HashSet;

use super::models::{
    EncodingDescriptor, FormatKind, FormatOption, AMBIGUOUS_ID, CANONICAL_LADDER,
};

/// Catalog entry with its display label
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub label: String,
    pub descriptor: EncodingDescriptor,
}

impl CatalogEntry {
    pub fn to_option(&self) -> FormatOption {
        FormatOption::from_descriptor(&self.descriptor, self.label.clone())
    }
}

/// Normalized, ordered list of encodings for one request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build the catalog for the given media kind
    pub fn normalize(descriptors: &[EncodingDescriptor], kind: FormatKind) -> Self {
        match kind {
            FormatKind::Video => Self::normalize_video(descriptors),
            FormatKind::Audio => Self::normalize_audio(descriptors),
        }
    }

    fn normalize_video(descriptors: &[EncodingDescriptor]) -> Self {
        let mut seen_labels = HashSet::new();
        let mut ids = UniqueIds::default();
        let mut entries = Vec::new();

        for d in descriptors {
            if !d.has_video() || !d.container.is_video_container() {
                continue;
            }
            let Some(label) = d.quality_label() else {
                continue;
            };
            if !seen_labels.insert(label.clone()) {
                continue;
            }

            let mut descriptor = d.clone();
            descriptor.id = ids.claim(&d.id, || format!("video-{}", d.height.unwrap_or(0)));
            entries.push(CatalogEntry { label, descriptor });
        }

        for height in CANONICAL_LADDER {
            let label = format!("{}p", height);
            if seen_labels.contains(&label) {
                continue;
            }
            let mut descriptor = EncodingDescriptor::placeholder(height);
            descriptor.id = ids.claim(&descriptor.id, || format!("auto-{}", height));
            entries.push(CatalogEntry { label, descriptor });
        }

        // Stable: equal heights keep discovery order, heightless entries last
        entries.sort_by(|a, b| b.descriptor.height.cmp(&a.descriptor.height));

        Self { entries }
    }

    fn normalize_audio(descriptors: &[EncodingDescriptor]) -> Self {
        let mut seen_labels = HashSet::new();
        let mut ids = UniqueIds::default();
        let mut entries = Vec::new();

        for d in descriptors {
            if d.has_video() || !d.audio_codec.is_real() || !d.container.is_audio_container() {
                continue;
            }
            let label = audio_label(d);
            if !seen_labels.insert(label.clone()) {
                continue;
            }

            let mut descriptor = d.clone();
            descriptor.id = ids.claim(&d.id, || format!("audio-{}", label));
            entries.push(CatalogEntry { label, descriptor });
        }

        entries.sort_by(|a, b| {
            let ra = a.descriptor.bitrate.unwrap_or(0.0);
            let rb = b.descriptor.bitrate.unwrap_or(0.0);
            rb.total_cmp(&ra)
        });

        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Response shape for /api/video/info
    pub fn to_options(&self) -> Vec<FormatOption> {
        self.entries.iter().map(CatalogEntry::to_option).collect()
    }
}

fn audio_label(d: &EncodingDescriptor) -> String {
    match d.bitrate {
        Some(rate) if rate > 0.0 => format!("{}kbps", rate.round() as u64),
        _ => "audio".to_string(),
    }
}

/// Hands out catalog-unique ids
#[derive(Default)]
struct UniqueIds {
    taken: HashSet<String>,
}

impl UniqueIds {
    /// Keep `id` when it is usable and free, otherwise synthesize one
    fn claim(&mut self, id: &str, synthesize: impl FnOnce() -> String) -> String {
        let base = if id.is_empty() || id == AMBIGUOUS_ID || self.taken.contains(id) {
            synthesize()
        } else {
            id.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }

        self.taken.insert(candidate.clone());
        candidate
    }
}
