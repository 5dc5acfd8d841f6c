use rust_photodetector::features::{
    InMemoryBackend, Keypoint, OrbDescriptor, SyntheticImage, seeded_descriptor,
};
use rust_photodetector::{DetectorConfig, PhotoDetector};

pub fn descriptor(seed: u32) -> OrbDescriptor {
    seeded_descriptor(seed.into())
}

/// Flip the first `bits` bits of `d`.
pub fn perturb(mut d: OrbDescriptor, bits: usize) -> OrbDescriptor {
    for i in 0..bits {
        d[i / 8] ^= 1 << (i % 8);
    }
    d
}

/// Image whose features carry the descriptors of `seeds`, with responses
/// decreasing in order.
pub fn scene(seeds: impl IntoIterator<Item = u32>) -> SyntheticImage {
    let features: Vec<(Keypoint, OrbDescriptor)> = seeds
        .into_iter()
        .enumerate()
        .map(|(i, seed)| {
            let kp = Keypoint::new((i % 64) as f32 * 10.0, (i / 64) as f32 * 10.0, 1000.0 - i as f32);
            (kp, descriptor(seed))
        })
        .collect();
    SyntheticImage::new(1280, 960, features)
}

pub fn detector(config: DetectorConfig) -> PhotoDetector<InMemoryBackend> {
    PhotoDetector::with_backend(InMemoryBackend::new(), config)
}
