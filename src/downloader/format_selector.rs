// FormatSelector - turns a quality request into a yt-dlp selector
//
// Policy for video requests:
// 1. Keep only directly downloadable video formats
// 2. Exact height match: highest bitrate wins, earliest on ties.
//    Muxed formats are used as-is, video-only ones get an audio chain.
// 3. No exact match: hand-tuned degradation chain for the nearest
//    canonical height
// 4. Nothing usable at all: generic height-capped chain

use tracing::debug;

use super::models::{EncodingDescriptor, FormatKind, QualityTarget, SelectorPlan};

/// Best audio, m4a preferred. Used for audio requests and as the audio
/// half of a merged video-only selection.
pub const AUDIO_SELECTOR: &str = "bestaudio[ext=m4a]/bestaudio";

/// Best overall when no height is requested and nothing is usable
pub const BEST_SELECTOR: &str = "best[ext=mp4]/best";

/// Degradation chains keyed by canonical height. Each one tries the exact
/// height, then anything at or below it, then the next two steps up.
const FALLBACK_TABLE: [(u32, &str); 8] = [
    (
        144,
        "best[height=144][ext=mp4]/best[height<=144][ext=mp4]/best[height<=144]/best[height<=240]/best[height<=360]/best",
    ),
    (
        240,
        "best[height=240][ext=mp4]/best[height<=240][ext=mp4]/best[height<=240]/best[height<=360]/best[height<=480]/best",
    ),
    (
        360,
        "best[height=360][ext=mp4]/best[height<=360][ext=mp4]/best[height<=360]/best[height<=480]/best[height<=720]/best",
    ),
    (
        480,
        "best[height=480][ext=mp4]/best[height<=480][ext=mp4]/best[height<=480]/best[height<=720]/best[height<=1080]/best",
    ),
    (
        720,
        "best[height=720][ext=mp4]/best[height<=720][ext=mp4]/best[height<=720]/best[height<=1080]/best[height<=1440]/best",
    ),
    (
        1080,
        "best[height=1080][ext=mp4]/best[height<=1080][ext=mp4]/best[height<=1080]/best[height<=1440]/best[height<=2160]/best",
    ),
    (
        1440,
        "best[height=1440][ext=mp4]/best[height<=1440][ext=mp4]/best[height<=1440]/best[height<=2160]/best",
    ),
    (
        2160,
        "best[height=2160][ext=mp4]/best[height<=2160][ext=mp4]/best[height<=2160]/best",
    ),
];

/// Format selector with exact-match-first resolution
pub struct FormatSelector;

impl FormatSelector {
    /// Resolve a plan. Never fails and never returns an empty selector.
    pub fn resolve(
        formats: &[EncodingDescriptor],
        target: QualityTarget,
        kind: FormatKind,
    ) -> SelectorPlan {
        if kind == FormatKind::Audio || target == QualityTarget::Audio {
            return SelectorPlan::Fallback(AUDIO_SELECTOR.to_string());
        }

        let candidates = Self::downloadable_video(formats);
        debug!(
            total = formats.len(),
            usable = candidates.len(),
            "[FormatSelector] filtered candidates"
        );

        let target_height = match target {
            QualityTarget::Height(h) => h,
            // `best` resolves to the tallest usable format
            _ => match candidates.iter().filter_map(|f| f.height).max() {
                Some(h) => h,
                None => return SelectorPlan::Fallback(BEST_SELECTOR.to_string()),
            },
        };

        if candidates.is_empty() {
            return SelectorPlan::Fallback(Self::generic_fallback(target_height));
        }

        let exact: Vec<&EncodingDescriptor> = candidates
            .iter()
            .copied()
            .filter(|f| f.height == Some(target_height))
            .collect();

        if !exact.is_empty() {
            let muxed: Vec<&EncodingDescriptor> =
                exact.iter().copied().filter(|f| f.has_audio()).collect();

            if let Some(best) = Self::highest_bitrate(&muxed) {
                debug!(id = %best.id, "[FormatSelector] exact match with audio");
                return SelectorPlan::Single(best.id.clone());
            }

            if let Some(best) = Self::highest_bitrate(&exact) {
                debug!(id = %best.id, "[FormatSelector] exact match, video only");
                return SelectorPlan::Composite {
                    video_id: best.id.clone(),
                    audio: AUDIO_SELECTOR.to_string(),
                };
            }
        }

        let available: Vec<u32> = candidates.iter().filter_map(|f| f.height).collect();
        SelectorPlan::Fallback(Self::fallback_for(target_height, &available))
    }

    /// Formats that can be captured directly as video
    fn downloadable_video(formats: &[EncodingDescriptor]) -> Vec<&EncodingDescriptor> {
        formats
            .iter()
            .filter(|f| {
                !f.placeholder
                    && f.has_selectable_id()
                    && f.has_video()
                    && f.protocol.is_direct()
                    && f.container.is_video_container()
                    && !f.is_storyboard()
            })
            .collect()
    }

    /// Highest bitrate, first one wins on ties
    fn highest_bitrate<'a>(formats: &[&'a EncodingDescriptor]) -> Option<&'a EncodingDescriptor> {
        let mut best: Option<&'a EncodingDescriptor> = None;
        for f in formats {
            let rate = f.bitrate.unwrap_or(0.0);
            match best {
                Some(current) if rate <= current.bitrate.unwrap_or(0.0) => {}
                _ => best = Some(*f),
            }
        }
        best
    }

    /// Chain used when the catalog has nothing directly usable
    pub fn generic_fallback(height: u32) -> String {
        format!(
            "best[height<={h}][ext=mp4]/best[height<={h}]/best",
            h = height
        )
    }

    /// Table entry for the target, snapping non-canonical heights to the
    /// nearest canonical height present among the candidates
    fn fallback_for(target: u32, available: &[u32]) -> String {
        if let Some(chain) = Self::table_entry(target) {
            return chain.to_string();
        }

        let nearest = available
            .iter()
            .copied()
            .filter(|h| Self::table_entry(*h).is_some())
            .min_by_key(|h| (h.abs_diff(target), *h));

        match nearest.and_then(Self::table_entry) {
            Some(chain) => chain.to_string(),
            None => Self::generic_fallback(target),
        }
    }

    fn table_entry(height: u32) -> Option<&'static str> {
        FALLBACK_TABLE
            .iter()
            .find(|(h, _)| *h == height)
            .map(|(_, chain)| *chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::{CodecMarker, Container, TransportProtocol};

    fn make_video_format(id: &str, height: u32, acodec: &str, tbr: Option<f64>) -> EncodingDescriptor {
        EncodingDescriptor {
            id: id.to_string(),
            container: Container::Mp4,
            ext: "mp4".to_string(),
            height: Some(height),
            fps: Some(30.0),
            video_codec: CodecMarker::Real("avc1.4d401f".to_string()),
            audio_codec: CodecMarker::parse(Some(acodec)),
            bitrate: tbr,
            protocol: TransportProtocol::Https,
            file_size: None,
            placeholder: false,
        }
    }

    #[test]
    fn test_audio_kind_ignores_catalog() {
        let plan = FormatSelector::resolve(&[], QualityTarget::Height(720), FormatKind::Audio);
        assert_eq!(plan, SelectorPlan::Fallback(AUDIO_SELECTOR.to_string()));
    }

    #[test]
    fn test_records_without_usable_id_are_skipped() {
        let raw = serde_json::json!({
            "ext": "mp4", "height": 720, "vcodec": "avc1", "acodec": "mp4a", "protocol": "https"
        });
        let no_id = EncodingDescriptor::from_raw(&raw);
        assert_eq!(no_id.id, "");
        let ambiguous = make_video_format("auto", 720, "none", Some(3000.0));

        for formats in [vec![no_id.clone()], vec![ambiguous.clone()], vec![no_id, ambiguous]] {
            let plan = FormatSelector::resolve(&formats, QualityTarget::Height(720), FormatKind::Video);
            let expr = plan.expression();
            assert!(matches!(plan, SelectorPlan::Fallback(_)), "{}", expr);
            assert!(!expr.is_empty());
            assert!(!expr.starts_with('+'));
            assert!(!expr.starts_with("auto"));
        }
    }

    #[test]
    fn test_video_only_exact_match_gets_audio_merge() {
        let formats = vec![make_video_format("137", 1080, "none", Some(4000.0))];

        let plan = FormatSelector::resolve(&formats, QualityTarget::Height(1080), FormatKind::Video);

        assert_eq!(plan.expression(), "137+bestaudio[ext=m4a]/bestaudio");
    }

    #[test]
    fn test_muxed_exact_match_preferred() {
        let formats = vec![
            make_video_format("137", 720, "none", Some(9000.0)),
            make_video_format("22", 720, "mp4a.40.2", Some(1500.0)),
        ];

        let plan = FormatSelector::resolve(&formats, QualityTarget::Height(720), FormatKind::Video);

        assert_eq!(plan, SelectorPlan::Single("22".to_string()));
    }

    #[test]
    fn test_highest_bitrate_then_catalog_order() {
        let formats = vec![
            make_video_format("a", 480, "opus", Some(800.0)),
            make_video_format("b", 480, "opus", Some(1200.0)),
            make_video_format("c", 480, "opus", Some(1200.0)),
        ];

        let plan = FormatSelector::resolve(&formats, QualityTarget::Height(480), FormatKind::Video);
        assert_eq!(plan, SelectorPlan::Single("b".to_string()));

        let untagged = vec![
            make_video_format("x", 480, "opus", None),
            make_video_format("y", 480, "opus", None),
        ];
        let plan = FormatSelector::resolve(&untagged, QualityTarget::Height(480), FormatKind::Video);
        assert_eq!(plan, SelectorPlan::Single("x".to_string()));
    }

    #[test]
    fn test_fragmented_only_uses_generic_fallback() {
        let mut hls = make_video_format("hls-480", 480, "mp4a.40.2", Some(900.0));
        hls.protocol = TransportProtocol::Fragmented;

        let plan = FormatSelector::resolve(&[hls], QualityTarget::Height(480), FormatKind::Video);

        assert_eq!(
            plan.expression(),
            "best[height<=480][ext=mp4]/best[height<=480]/best"
        );
    }

    #[test]
    fn test_storyboards_and_placeholders_skipped() {
        let sb = make_video_format("sb0", 90, "none", None);
        let mut placeholder = EncodingDescriptor::placeholder(720);
        placeholder.video_codec = CodecMarker::Real("avc1".into());

        let plan =
            FormatSelector::resolve(&[sb, placeholder], QualityTarget::Height(720), FormatKind::Video);

        assert_eq!(plan.expression(), FormatSelector::generic_fallback(720));
    }

    #[test]
    fn test_missing_height_uses_table() {
        let formats = vec![make_video_format("136", 720, "none", Some(2000.0))];

        let plan = FormatSelector::resolve(&formats, QualityTarget::Height(1080), FormatKind::Video);

        assert_eq!(plan.expression(), FormatSelector::table_entry(1080).unwrap());
    }

    #[test]
    fn test_non_canonical_height_snaps_to_nearest_available() {
        let formats = vec![
            make_video_format("a", 480, "none", None),
            make_video_format("b", 720, "none", None),
        ];

        // 600 is equally far from 480 and 720: lower wins
        let plan = FormatSelector::resolve(&formats, QualityTarget::Height(600), FormatKind::Video);
        assert_eq!(plan.expression(), FormatSelector::table_entry(480).unwrap());

        let plan = FormatSelector::resolve(&formats, QualityTarget::Height(700), FormatKind::Video);
        assert_eq!(plan.expression(), FormatSelector::table_entry(720).unwrap());
    }

    #[test]
    fn test_non_canonical_without_canonical_candidates() {
        let formats = vec![make_video_format("odd", 1280, "none", None)];

        let plan = FormatSelector::resolve(&formats, QualityTarget::Height(1000), FormatKind::Video);

        assert_eq!(plan.expression(), FormatSelector::generic_fallback(1000));
    }

    #[test]
    fn test_best_targets_tallest_candidate() {
        let formats = vec![
            make_video_format("136", 720, "none", Some(2000.0)),
            make_video_format("137", 1080, "none", Some(4000.0)),
        ];

        let plan = FormatSelector::resolve(&formats, QualityTarget::Best, FormatKind::Video);
        assert_eq!(plan.expression(), "137+bestaudio[ext=m4a]/bestaudio");

        let plan = FormatSelector::resolve(&[], QualityTarget::Best, FormatKind::Video);
        assert_eq!(plan.expression(), BEST_SELECTOR);
    }

    #[test]
    fn test_table_chains_degrade_consistently() {
        for (height, chain) in FALLBACK_TABLE {
            assert!(chain.starts_with(&format!("best[height={}][ext=mp4]/", height)));
            assert!(chain.ends_with("/best"));

            let caps: Vec<u32> = chain
                .split('/')
                .filter_map(|part| part.strip_prefix("best[height<="))
                .filter_map(|rest| rest.split(']').next())
                .filter_map(|n| n.parse().ok())
                .collect();
            assert!(caps.windows(2).all(|w| w[0] <= w[1]), "{}", chain);
            assert!(caps.iter().all(|c| *c >= height));
        }
    }

    #[test]
    fn test_plans_never_empty() {
        let formats = vec![make_video_format("a", 360, "none", None)];
        for height in [1, 144, 200, 240, 1000, 2160, 5000] {
            let plan = FormatSelector::resolve(&formats, QualityTarget::Height(height), FormatKind::Video);
            assert!(!plan.expression().is_empty());
        }
    }
}
