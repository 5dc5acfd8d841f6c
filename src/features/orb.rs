//! OpenCV-backed extraction: FAST corners described with ORB.

use std::path::Path;

use anyhow::{Context, Result, bail};
use opencv::core::{KeyPoint, Mat, Size, Vector};
use opencv::features2d::{self, FastFeatureDetector, FastFeatureDetector_DetectorType};
use opencv::imgcodecs::{self, IMREAD_GRAYSCALE};
use opencv::imgproc;
use opencv::prelude::*;

use super::{
    DESCRIPTOR_BYTES, FeatureBackend, FeatureSet, Keypoint, OrbDescriptor, downscaled_size,
};

/// FAST + ORB extraction backend.
///
/// OpenCV algorithm objects need `&mut self` to run, so a fresh detector is
/// created per call; this keeps the backend `Sync` for parallel library builds.
#[derive(Debug, Clone)]
pub struct OrbBackend {
    pub fast_threshold: i32,
    pub nonmax_suppression: bool,
}

impl Default for OrbBackend {
    fn default() -> Self {
        Self {
            fast_threshold: 10,
            nonmax_suppression: true,
        }
    }
}

impl OrbBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeatureBackend for OrbBackend {
    type Image = Mat;

    fn load_image(&self, path: &Path) -> Result<Mat> {
        let path_str = path
            .to_str()
            .with_context(|| format!("Non UTF-8 image path {:?}", path))?;
        let image = imgcodecs::imread(path_str, IMREAD_GRAYSCALE)
            .with_context(|| format!("Failed to read image {:?}", path))?;
        // imread signals unreadable files with an empty matrix
        if image.empty() {
            bail!("Unreadable or missing image {:?}", path);
        }
        Ok(image)
    }

    fn resize(&self, image: Mat, max_side: u32) -> Result<Mat> {
        let cols = u32::try_from(image.cols()).unwrap_or(0);
        let rows = u32::try_from(image.rows()).unwrap_or(0);
        let Some((width, height, _)) = downscaled_size(cols, rows, max_side) else {
            return Ok(image);
        };
        // never larger than the source, so it fits back into i32
        let size = Size::new(width as i32, height as i32);
        let mut resized = Mat::default();
        imgproc::resize(&image, &mut resized, size, 0.0, 0.0, imgproc::INTER_AREA)?;
        Ok(resized)
    }

    fn detect(&self, image: &Mat) -> Result<Vec<Keypoint>> {
        let mut fast = FastFeatureDetector::create(
            self.fast_threshold,
            self.nonmax_suppression,
            FastFeatureDetector_DetectorType::TYPE_9_16,
        )?;
        let mut keypoints = Vector::<KeyPoint>::new();
        fast.detect(image, &mut keypoints, &Mat::default())?;
        Ok(keypoints.iter().map(|kp| from_cv(&kp)).collect())
    }

    fn describe(&self, image: &Mat, keypoints: Vec<Keypoint>) -> Result<FeatureSet> {
        let mut orb = features2d::ORB::create_def()?;
        let mut cv_keypoints = keypoints
            .iter()
            .map(to_cv)
            .collect::<Result<Vector<KeyPoint>>>()?;
        let mut descriptors = Mat::default();
        // ORB drops keypoints too close to the border; `cv_keypoints` is updated in place
        orb.compute(image, &mut cv_keypoints, &mut descriptors)?;

        let keypoints: Vec<Keypoint> = cv_keypoints.iter().map(|kp| from_cv(&kp)).collect();
        let descriptors = descriptors_from_mat(&descriptors)?;
        if keypoints.len() != descriptors.len() {
            bail!(
                "ORB returned {} descriptors for {} keypoints",
                descriptors.len(),
                keypoints.len()
            );
        }
        Ok(FeatureSet {
            keypoints,
            descriptors,
        })
    }
}

fn from_cv(kp: &KeyPoint) -> Keypoint {
    Keypoint {
        pt: nalgebra::Point2::new(kp.pt().x, kp.pt().y),
        size: kp.size(),
        angle: kp.angle(),
        response: kp.response(),
        octave: kp.octave(),
        class_id: kp.class_id(),
    }
}

fn to_cv(kp: &Keypoint) -> Result<KeyPoint> {
    Ok(KeyPoint::new_coords(
        kp.pt.x,
        kp.pt.y,
        kp.size,
        kp.angle,
        kp.response,
        kp.octave,
        kp.class_id,
    )?)
}

/// Copy an `N x 32` CV_8U descriptor matrix into fixed-size rows.
pub fn descriptors_from_mat(mat: &Mat) -> Result<Vec<OrbDescriptor>> {
    if mat.empty() {
        return Ok(Vec::new());
    }
    if mat.cols() as usize != DESCRIPTOR_BYTES {
        bail!("expected {} descriptor columns, got {}", DESCRIPTOR_BYTES, mat.cols());
    }
    let mut rows = Vec::with_capacity(mat.rows() as usize);
    for r in 0..mat.rows() {
        let row = mat.at_row::<u8>(r)?;
        let mut desc = [0u8; DESCRIPTOR_BYTES];
        desc.copy_from_slice(row);
        rows.push(desc);
    }
    Ok(rows)
}

/// Pack descriptor rows into an `N x 32` CV_8U matrix.
pub fn descriptors_to_mat(descriptors: &[OrbDescriptor]) -> Result<Mat> {
    if descriptors.is_empty() {
        return Ok(Mat::default());
    }
    Ok(Mat::from_slice_2d(descriptors)?)
}
