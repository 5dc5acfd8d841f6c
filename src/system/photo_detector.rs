//! PhotoDetector - library management and query orchestration.
//!
//! The `PhotoDetector` is the top-level struct callers interact with. It owns
//! the injected extraction backend and matcher, and the reference library
//! behind a `RwLock`: queries take the read side, `add`/`clear` the write
//! side, so a query never observes a half-applied mutation.

use std::path::Path;
use std::thread;
use std::time::Instant;

use anyhow::anyhow;
use crossbeam_channel::unbounded;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::config::DetectorConfig;
use crate::error::DetectorError;
use crate::features::{FeatureBackend, FeatureSet, KeypointSupply, top_keypoints};
use crate::library::{
    GeoPoint, GroupId, LibraryEntry, ReferenceHandle, ReferenceInfo, ReferenceLibrary,
};
use crate::matching::{DescriptorMatcher, HammingMatcher, filter_good_matches};
use crate::recognition::{
    Decision, DecisionEngine, Diagnostics, IdentifyOutcome, MatchedReference, NoMatchReason,
    TallyEntry, TimingStats, Verdict, VoteTally, retain_nearby,
};

/// Reference-image identification engine.
pub struct PhotoDetector<B: FeatureBackend, M: DescriptorMatcher = HammingMatcher> {
    backend: B,
    matcher: M,
    config: DetectorConfig,
    decision: DecisionEngine,
    library: RwLock<ReferenceLibrary>,
}

impl<B: FeatureBackend> PhotoDetector<B, HammingMatcher> {
    /// Detector using the brute-force Hamming matcher.
    pub fn with_backend(backend: B, config: DetectorConfig) -> Self {
        Self::new(backend, HammingMatcher, config)
    }
}

impl<B: FeatureBackend, M: DescriptorMatcher> PhotoDetector<B, M> {
    pub fn new(backend: B, matcher: M, config: DetectorConfig) -> Self {
        let decision = DecisionEngine::new(config.decision);
        Self {
            backend,
            matcher,
            config,
            decision,
            library: RwLock::new(ReferenceLibrary::new()),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of reference images in the library.
    pub fn len(&self) -> usize {
        self.library.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.library.read().is_empty()
    }

    /// Snapshot of the library contents, in slot order.
    pub fn references(&self) -> Vec<ReferenceInfo> {
        self.library.read().iter().map(|img| img.info()).collect()
    }

    /// Reference image behind `handle`, unless it has been cleared.
    pub fn reference(&self, handle: ReferenceHandle) -> Option<ReferenceInfo> {
        let library = self.library.read();
        let slot = library.slot_of(handle)?;
        library.get(slot).map(|img| img.info())
    }

    /// Index one reference image.
    pub fn add_to_library(
        &self,
        path: &Path,
        group: GroupId,
        location: Option<GeoPoint>,
    ) -> Result<ReferenceHandle, DetectorError> {
        let (features, _) = self.extract(path)?;
        let n_features = features.len();
        let handle = self.library.write().push(group, path, location, features);
        info!(
            reference = %handle,
            %group,
            n_features,
            path = %path.display(),
            "added reference image"
        );
        Ok(handle)
    }

    /// Index many reference images.
    ///
    /// Extraction runs on `config.workers` threads; the results are appended
    /// in input order under a single write lock. The returned vector is
    /// aligned with `entries`; failed entries are not added.
    pub fn add_all(&self, entries: &[LibraryEntry]) -> Vec<Result<ReferenceHandle, DetectorError>> {
        if entries.is_empty() {
            return Vec::new();
        }
        let workers = self.config.worker_count().clamp(1, entries.len());
        let start = Instant::now();

        let (job_tx, job_rx) = unbounded::<(usize, &LibraryEntry)>();
        let (result_tx, result_rx) = unbounded();
        for job in entries.iter().enumerate() {
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (idx, entry) in job_rx.iter() {
                        let extracted = self.extract(&entry.path);
                        if result_tx.send((idx, extracted)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut extracted: Vec<Option<Result<(FeatureSet, KeypointSupply), DetectorError>>> =
            entries.iter().map(|_| None).collect();
        for (idx, result) in result_rx.iter() {
            extracted[idx] = Some(result);
        }

        let results: Vec<Result<ReferenceHandle, DetectorError>> = {
            let mut library = self.library.write();
            entries
                .iter()
                .zip(extracted)
                .map(|(entry, result)| {
                    let result = result.unwrap_or_else(|| {
                        Err(DetectorError::features(
                            &entry.path,
                            anyhow!("extraction worker produced no result"),
                        ))
                    });
                    result.map(|(features, _)| {
                        library.push(entry.group, &entry.path, entry.location, features)
                    })
                })
                .collect()
        };

        let added = results.iter().filter(|r| r.is_ok()).count();
        info!(
            added,
            failed = results.len() - added,
            workers,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "library build finished"
        );
        results
    }

    /// Remove every reference image.
    pub fn clear_library(&self) {
        self.library.write().clear();
    }

    /// Identify the image at `path` against the library.
    ///
    /// An empty library yields `NoMatch(NoCandidates)` without reading the
    /// image. Only load, extraction and matcher failures are errors.
    pub fn identify(
        &self,
        path: &Path,
        location: Option<GeoPoint>,
    ) -> Result<IdentifyOutcome, DetectorError> {
        let t_start = Instant::now();
        if self.library.read().is_empty() {
            debug!(path = %path.display(), "library is empty, nothing to match");
            return Ok(IdentifyOutcome::no_candidates());
        }

        let (query, supply) = self.extract(path)?;
        let t_extracted = Instant::now();

        let library = self.library.read();
        let pool = library.descriptor_pool();
        let raw = self
            .matcher
            .match_descriptors(&query.descriptors, &pool)
            .map_err(DetectorError::matching)?;
        let filtered = filter_good_matches(&raw, &self.config.match_filter);
        let t_matched = Instant::now();

        let tally = VoteTally::from_correspondences(&filtered.kept, library.len())?;
        let mut candidates = tally.candidates(&library);
        retain_nearby(&mut candidates, location, &self.config.geo);
        debug!(
            query_features = query.len(),
            correspondences = raw.len(),
            filtered = filtered.kept.len(),
            candidates = candidates.len(),
            "tally ready"
        );

        let verdict = self.decision.decide(&candidates);
        let (decision, matched_slot) = match verdict {
            Verdict::Accepted { best, runner_up } => match library.get(best.slot) {
                Some(image) => (
                    Decision::Match(MatchedReference {
                        group: best.group,
                        reference: image.info(),
                        votes: best.votes,
                        runner_up_votes: runner_up.map(|c| c.votes),
                    }),
                    Some(best.slot),
                ),
                None => (Decision::NoMatch(NoMatchReason::NoCandidates), None),
            },
            Verdict::NoCandidates => (Decision::NoMatch(NoMatchReason::NoCandidates), None),
            Verdict::Ambiguous { best, runner_up } => (
                Decision::NoMatch(NoMatchReason::Ambiguous {
                    best_votes: best.votes,
                    runner_up_votes: runner_up.votes,
                }),
                None,
            ),
        };
        let t_decided = Instant::now();

        match &decision {
            Decision::Match(m) => info!(
                path = %path.display(),
                group = %m.group,
                reference = %m.reference.handle,
                votes = m.votes,
                "identified"
            ),
            Decision::NoMatch(reason) => info!(path = %path.display(), %reason, "no match"),
        }

        let diagnostics = self.config.collect_diagnostics.then(|| {
            let mut tally: Vec<TallyEntry> = candidates
                .iter()
                .map(|c| TallyEntry {
                    handle: c.handle,
                    group: c.group,
                    votes: c.votes,
                })
                .collect();
            tally.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.handle.cmp(&b.handle)));

            let matched_correspondences = match matched_slot {
                Some(slot) => filtered
                    .kept
                    .iter()
                    .filter(|m| m.reference_idx == slot)
                    .copied()
                    .collect(),
                None => Vec::new(),
            };

            Diagnostics {
                query_keypoints: query.keypoints.clone(),
                keypoint_supply: supply,
                n_correspondences: raw.len(),
                n_filtered: filtered.kept.len(),
                filter_threshold: filtered.threshold,
                min_distance: filtered.min_distance,
                max_distance: filtered.max_distance,
                tally,
                matched_correspondences,
                timing: TimingStats {
                    total_ms: ms_between(t_start, t_decided),
                    extract_ms: ms_between(t_start, t_extracted),
                    match_ms: ms_between(t_extracted, t_matched),
                    decide_ms: ms_between(t_matched, t_decided),
                },
            }
        });

        Ok(IdentifyOutcome {
            decision,
            diagnostics,
        })
    }

    /// Group of the reference image the query was identified as, if any.
    pub fn identify_group(
        &self,
        path: &Path,
        location: Option<GeoPoint>,
    ) -> Result<Option<GroupId>, DetectorError> {
        Ok(self.identify(path, location)?.decision.group())
    }

    /// Load, optionally downscale, detect, rank and describe.
    fn extract(&self, path: &Path) -> Result<(FeatureSet, KeypointSupply), DetectorError> {
        let image = self
            .backend
            .load_image(path)
            .map_err(|e| DetectorError::load(path, e))?;
        let image = match self.config.max_image_side {
            Some(side) => self
                .backend
                .resize(image, side)
                .map_err(|e| DetectorError::features(path, e))?,
            None => image,
        };

        let raw = self
            .backend
            .detect(&image)
            .map_err(|e| DetectorError::features(path, e))?;
        let n_detected = raw.len();
        let (ranked, supply) = top_keypoints(raw, self.config.max_keypoints);
        let features = self
            .backend
            .describe(&image, ranked)
            .map_err(|e| DetectorError::features(path, e))?;

        debug!(
            path = %path.display(),
            n_detected,
            n_described = features.len(),
            "extracted features"
        );
        Ok((features, supply))
    }
}

fn ms_between(from: Instant, to: Instant) -> f64 {
    to.duration_since(from).as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::features::{InMemoryBackend, Keypoint, SyntheticImage, seeded_descriptor};

    fn image(seeds: impl IntoIterator<Item = u32>) -> SyntheticImage {
        let features = seeds
            .into_iter()
            .enumerate()
            .map(|(i, seed)| (Keypoint::new(i as f32, i as f32, 1.0), seeded_descriptor(seed.into())))
            .collect();
        SyntheticImage::new(640, 480, features)
    }

    fn detector() -> PhotoDetector<InMemoryBackend> {
        let config = DetectorConfig {
            max_keypoints: 50,
            workers: 2,
            ..Default::default()
        };
        PhotoDetector::with_backend(InMemoryBackend::new(), config)
    }

    #[test]
    fn test_self_match() {
        let det = detector();
        det.backend().insert("a.jpg", image(0..40));
        det.add_to_library(Path::new("a.jpg"), GroupId::new(3), None)
            .unwrap();

        let outcome = det.identify(Path::new("a.jpg"), None).unwrap();
        match &outcome.decision {
            Decision::Match(m) => {
                assert_eq!(m.group, GroupId::new(3));
                assert_eq!(m.reference.source_path, PathBuf::from("a.jpg"));
                assert_eq!(m.votes, 40);
            }
            other => panic!("expected match, got {:?}", other),
        }
        let diag = outcome.diagnostics.unwrap();
        assert_eq!(diag.matched_correspondences.len(), 40);
        assert_eq!(diag.filter_threshold, Some(0.02));
    }

    #[test]
    fn test_clear_then_identify_is_no_candidates() {
        let det = detector();
        det.backend().insert("a.jpg", image(0..40));
        det.add_to_library(Path::new("a.jpg"), GroupId::new(1), None)
            .unwrap();
        det.clear_library();

        assert!(det.is_empty());
        let outcome = det.identify(Path::new("never-registered.jpg"), None).unwrap();
        assert_eq!(
            outcome.decision,
            Decision::NoMatch(NoMatchReason::NoCandidates)
        );
    }

    #[test]
    fn test_load_failure_is_typed() {
        let det = detector();
        let err = det
            .add_to_library(Path::new("missing.jpg"), GroupId::new(1), None)
            .unwrap_err();
        assert!(err.is_load_failure());
        assert!(det.is_empty());

        det.backend().insert("a.jpg", image(0..10));
        det.add_to_library(Path::new("a.jpg"), GroupId::new(1), None)
            .unwrap();
        let err = det.identify(Path::new("missing.jpg"), None).unwrap_err();
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_picks_correct_group() {
        let det = detector();
        det.backend().insert("museum.jpg", image(0..30));
        det.backend().insert("bridge.jpg", image(100..130));
        det.backend().insert("query.jpg", image(100..125));
        det.add_to_library(Path::new("museum.jpg"), GroupId::new(1), None)
            .unwrap();
        det.add_to_library(Path::new("bridge.jpg"), GroupId::new(2), None)
            .unwrap();

        let group = det.identify_group(Path::new("query.jpg"), None).unwrap();
        assert_eq!(group, Some(GroupId::new(2)));
    }

    #[test]
    fn test_ambiguous_when_query_splits() {
        let det = detector();
        det.backend().insert("a.jpg", image(0..20));
        det.backend().insert("b.jpg", image(100..120));
        // half the query features come from each reference
        det.backend()
            .insert("query.jpg", image((0..10).chain(100..110)));
        det.add_to_library(Path::new("a.jpg"), GroupId::new(1), None)
            .unwrap();
        det.add_to_library(Path::new("b.jpg"), GroupId::new(2), None)
            .unwrap();

        let outcome = det.identify(Path::new("query.jpg"), None).unwrap();
        assert!(matches!(
            outcome.decision,
            Decision::NoMatch(NoMatchReason::Ambiguous { .. })
        ));
        let diag = outcome.diagnostics.unwrap();
        assert_eq!(diag.tally.len(), 2);
        assert!(diag.matched_correspondences.is_empty());
    }

    #[test]
    fn test_geo_filter_resolves_ambiguity() {
        let det = detector();
        det.backend().insert("a.jpg", image(0..20));
        det.backend().insert("b.jpg", image(100..120));
        det.backend()
            .insert("query.jpg", image((0..10).chain(100..110)));
        let here = GeoPoint::new(52.5163, 13.3777);
        let elsewhere = GeoPoint::new(52.5200, 13.4050);
        det.add_to_library(Path::new("a.jpg"), GroupId::new(1), Some(here))
            .unwrap();
        det.add_to_library(Path::new("b.jpg"), GroupId::new(2), Some(elsewhere))
            .unwrap();

        let group = det
            .identify_group(Path::new("query.jpg"), Some(here))
            .unwrap();
        assert_eq!(group, Some(GroupId::new(1)));
    }

    #[test]
    fn test_add_all_preserves_order_and_reports_failures() {
        let det = detector();
        for i in 0..6u32 {
            det.backend()
                .insert(format!("{i}.jpg"), image(i * 100..i * 100 + 20));
        }
        let mut entries: Vec<LibraryEntry> = (0..6u64)
            .map(|i| LibraryEntry::new(format!("{i}.jpg"), GroupId::new(i), None))
            .collect();
        entries.insert(3, LibraryEntry::new("broken.jpg", GroupId::new(99), None));

        let results = det.add_all(&entries);
        assert_eq!(results.len(), 7);
        assert!(results[3].as_ref().unwrap_err().is_load_failure());
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 6);

        let groups: Vec<u64> = det.references().iter().map(|r| r.group.0).collect();
        assert_eq!(groups, vec![0, 1, 2, 3, 4, 5]);

        let group = det.identify_group(Path::new("4.jpg"), None).unwrap();
        assert_eq!(group, Some(GroupId::new(4)));
    }

    #[test]
    fn test_downscaled_reference_self_matches() {
        let config = DetectorConfig {
            max_image_side: Some(100),
            ..Default::default()
        };
        let det = PhotoDetector::with_backend(InMemoryBackend::new(), config);
        det.backend().insert("a.jpg", image(0..40));
        det.backend().insert("b.jpg", image(500..540));
        det.add_to_library(Path::new("a.jpg"), GroupId::new(1), None)
            .unwrap();
        det.add_to_library(Path::new("b.jpg"), GroupId::new(2), None)
            .unwrap();

        // 640x480 scaled to fit 100: keypoint (39, 39) lands at 39 * 100 / 640
        {
            let library = det.library.read();
            let last = library.get(0).unwrap().features.keypoints[39];
            assert!((last.pt.x - 6.09375).abs() < 1e-4);
            assert!((last.pt.y - 6.09375).abs() < 1e-4);
        }

        let outcome = det.identify(Path::new("a.jpg"), None).unwrap();
        assert_eq!(outcome.decision.group(), Some(GroupId::new(1)));
        let diag = outcome.diagnostics.unwrap();
        assert!(diag.query_keypoints.iter().all(|kp| kp.pt.x <= 100.0));
    }

    #[test]
    fn test_reference_lookup_by_handle() {
        let det = detector();
        det.backend().insert("a.jpg", image(0..10));
        let handle = det
            .add_to_library(Path::new("a.jpg"), GroupId::new(4), None)
            .unwrap();
        let info = det.reference(handle).unwrap();
        assert_eq!(info.group, GroupId::new(4));
        assert_eq!(info.n_features, 10);

        det.clear_library();
        assert!(det.reference(handle).is_none());
    }

    #[test]
    fn test_diagnostics_can_be_disabled() {
        let config = DetectorConfig {
            collect_diagnostics: false,
            ..Default::default()
        };
        let det = PhotoDetector::with_backend(InMemoryBackend::new(), config);
        det.backend().insert("a.jpg", image(0..10));
        det.add_to_library(Path::new("a.jpg"), GroupId::new(1), None)
            .unwrap();
        let outcome = det.identify(Path::new("a.jpg"), None).unwrap();
        assert!(outcome.decision.is_match());
        assert!(outcome.diagnostics.is_none());
    }

    #[test]
    fn test_insufficient_keypoints_reported() {
        let det = detector();
        det.backend().insert("a.jpg", image(0..10));
        det.add_to_library(Path::new("a.jpg"), GroupId::new(1), None)
            .unwrap();
        let diag = det
            .identify(Path::new("a.jpg"), None)
            .unwrap()
            .diagnostics
            .unwrap();
        assert_eq!(
            diag.keypoint_supply,
            KeypointSupply::Insufficient {
                found: 10,
                requested: 50
            }
        );
    }
}
