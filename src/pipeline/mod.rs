//! Evaluation pipeline.
//!
//! Loads the ground truth and both candidates, runs the enabled metrics in
//! reporting order and collects the results into an [`EvaluationReport`].
//! A failing metric aborts the whole run.

use std::path::PathBuf;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::config::{EvalConfig, MetricKind};
use crate::error::Result;
use crate::features::{open_vgg19, FeatureExtractor};
use crate::io::{load_linear, save_match_overlay, save_srgb};
use crate::metrics::{
    calculate_psnr, calculate_ssim, feature_distance, frequency_spectrum, l2_distance,
    FeatureDistance, FrequencySpectrum, L2Distance, PatchMatcher, PatternMatchScore, PsnrResult,
    SsimConfig, SsimResult,
};
use crate::{LinearImage, Shape};

/// Metric results for one candidate against the ground truth.
#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    /// Candidate name ("bad" or "good").
    pub candidate: String,
    /// Pixel-space L2 distance.
    pub l2: Option<L2Distance>,
    /// L2 distance between FFT magnitude spectra.
    pub fft_l2: Option<L2Distance>,
    /// Structural similarity.
    pub ssim: Option<SsimResult>,
    /// Peak signal-to-noise ratio.
    pub psnr: Option<PsnrResult>,
    /// VGG19 feature distance.
    pub vgg19: Option<FeatureDistance>,
    /// Patch pattern-match score.
    pub pattern_match: Option<PatternMatchScore>,
}

impl PairReport {
    fn new(candidate: &str) -> Self {
        Self {
            candidate: candidate.to_string(),
            l2: None,
            fft_l2: None,
            ssim: None,
            psnr: None,
            vgg19: None,
            pattern_match: None,
        }
    }

    /// Formatted value of one metric, if it was computed.
    pub fn value(&self, metric: MetricKind) -> Option<String> {
        match metric {
            MetricKind::L2 => self.l2.as_ref().map(ToString::to_string),
            MetricKind::FftL2 => self.fft_l2.as_ref().map(ToString::to_string),
            MetricKind::Ssim => self.ssim.as_ref().map(ToString::to_string),
            MetricKind::Psnr => self.psnr.as_ref().map(ToString::to_string),
            MetricKind::Vgg19 => self.vgg19.as_ref().map(ToString::to_string),
            MetricKind::PatternMatch => self.pattern_match.as_ref().map(ToString::to_string),
        }
    }
}

/// Results of a full evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Ground-truth file, when loaded from disk.
    pub ground_truth: Option<PathBuf>,
    /// Shape shared by all inputs.
    pub shape: Shape,
    /// Metrics that were requested, in reporting order.
    pub metrics: Vec<MetricKind>,
    /// Metrics that were requested but could not run.
    pub skipped: Vec<MetricKind>,
    /// One entry per candidate.
    pub pairs: Vec<PairReport>,
}

impl EvaluationReport {
    /// Look up the results for a candidate by name.
    pub fn pair(&self, candidate: &str) -> Option<&PairReport> {
        self.pairs.iter().find(|p| p.candidate == candidate)
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.ground_truth {
            writeln!(f, "Ground truth: {} ({})", path.display(), self.shape)?;
            writeln!(f)?;
        }
        for metric in &self.metrics {
            writeln!(f, "{} ({}):", metric.label(), metric.hint())?;
            if self.skipped.contains(metric) {
                writeln!(f, "  skipped")?;
                continue;
            }
            for pair in &self.pairs {
                if let Some(value) = pair.value(*metric) {
                    writeln!(f, "  {:<5} {}", pair.candidate, value)?;
                }
            }
        }
        Ok(())
    }
}

/// Driver for one evaluation run.
pub struct Evaluation {
    config: EvalConfig,
    extractor: Option<Box<dyn FeatureExtractor>>,
    show_progress: bool,
}

impl Evaluation {
    /// Create an evaluation with the given configuration.
    pub fn new(config: EvalConfig) -> Self {
        Self {
            config,
            extractor: None,
            show_progress: false,
        }
    }

    /// Use `extractor` for the VGG19 metric.
    pub fn with_feature_extractor(mut self, extractor: Box<dyn FeatureExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Show a progress bar during pattern matching.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Load the three captures and evaluate them.
    ///
    /// When the VGG19 metric is enabled, no extractor was injected and the
    /// configuration names a model, the model is loaded first.
    pub fn run(mut self) -> Result<EvaluationReport> {
        self.config.validate()?;

        if self.extractor.is_none() && self.config.is_enabled(MetricKind::Vgg19) {
            if let Some(model) = &self.config.vgg_model {
                self.extractor = Some(open_vgg19(model)?);
            }
        }

        let gt_path = self.config.ground_truth_path();
        let grayscale = self.config.grayscale;
        let ground_truth = load_linear(&gt_path, grayscale)?;
        let bad = load_linear(self.config.bad_path(), grayscale)?;
        let good = load_linear(self.config.good_path(), grayscale)?;

        let mut report = self.evaluate(&ground_truth, &bad, &good)?;
        report.ground_truth = Some(gt_path);
        Ok(report)
    }

    /// Evaluate already-loaded images.
    pub fn evaluate(
        &self,
        ground_truth: &LinearImage,
        bad: &LinearImage,
        good: &LinearImage,
    ) -> Result<EvaluationReport> {
        let config = &self.config;
        let candidates = [("bad", bad), ("good", good)];
        let mut pairs: Vec<PairReport> = candidates
            .iter()
            .map(|(name, _)| PairReport::new(name))
            .collect();
        let mut skipped = Vec::new();

        if config.is_enabled(MetricKind::L2) {
            let start = Instant::now();
            for (pair, (_, candidate)) in pairs.iter_mut().zip(&candidates) {
                pair.l2 = Some(l2_distance(ground_truth, candidate)?);
            }
            log_timing(MetricKind::L2, start);
        }

        if config.is_enabled(MetricKind::FftL2) || config.fft_output.is_some() {
            let start = Instant::now();
            let gt_spectrum = frequency_spectrum(ground_truth);

            if let Some(path) = &config.fft_output {
                save_srgb(&gt_spectrum.normalized(), path)?;
            }

            if config.is_enabled(MetricKind::FftL2) {
                for (pair, (_, candidate)) in pairs.iter_mut().zip(&candidates) {
                    let spectrum: FrequencySpectrum = frequency_spectrum(candidate);
                    pair.fft_l2 = Some(l2_distance(gt_spectrum.as_image(), spectrum.as_image())?);
                }
            }
            log_timing(MetricKind::FftL2, start);
        }

        if config.is_enabled(MetricKind::Ssim) {
            let start = Instant::now();
            let ssim_config = SsimConfig::new().window_size(config.ssim_window);
            for (pair, (_, candidate)) in pairs.iter_mut().zip(&candidates) {
                pair.ssim = Some(calculate_ssim(ground_truth, candidate, &ssim_config)?);
            }
            log_timing(MetricKind::Ssim, start);
        }

        if config.is_enabled(MetricKind::Psnr) {
            let start = Instant::now();
            for (pair, (_, candidate)) in pairs.iter_mut().zip(&candidates) {
                pair.psnr = Some(calculate_psnr(ground_truth, candidate)?);
            }
            log_timing(MetricKind::Psnr, start);
        }

        if config.is_enabled(MetricKind::Vgg19) {
            match &self.extractor {
                Some(extractor) => {
                    let start = Instant::now();
                    log::debug!("Extracting features with {}", extractor.name());
                    for (pair, (_, candidate)) in pairs.iter_mut().zip(&candidates) {
                        pair.vgg19 = Some(feature_distance(
                            extractor.as_ref(),
                            ground_truth,
                            candidate,
                        )?);
                    }
                    log_timing(MetricKind::Vgg19, start);
                }
                None => {
                    log::warn!("Skipping VGG19 feature distance: no model configured");
                    skipped.push(MetricKind::Vgg19);
                }
            }
        }

        if config.is_enabled(MetricKind::PatternMatch) {
            let start = Instant::now();
            for (pair, (name, candidate)) in pairs.iter_mut().zip(&candidates) {
                let score = self.match_patterns(name, ground_truth, candidate)?;
                pair.pattern_match = Some(score);
            }
            log_timing(MetricKind::PatternMatch, start);

            if let Some(path) = &config.match_output {
                if let Some(score) = pairs
                    .iter()
                    .find(|p| p.candidate == "good")
                    .and_then(|p| p.pattern_match.as_ref())
                {
                    save_match_overlay(ground_truth, &score.segments, path)?;
                }
            }
        }

        Ok(EvaluationReport {
            ground_truth: None,
            shape: ground_truth.shape(),
            metrics: MetricKind::ALL
                .iter()
                .copied()
                .filter(|m| config.is_enabled(*m))
                .collect(),
            skipped,
            pairs,
        })
    }

    fn match_patterns(
        &self,
        name: &str,
        ground_truth: &LinearImage,
        candidate: &LinearImage,
    ) -> Result<PatternMatchScore> {
        let matcher = PatchMatcher::new(
            ground_truth,
            candidate,
            self.config.patch_size,
            self.config.search_radius,
        )?;

        let bar = if self.show_progress {
            ProgressBar::new(matcher.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{msg:>5} [{bar:40}] {pos}/{len} patches ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(name.to_string());

        let score: PatternMatchScore = matcher.inspect(|_| bar.inc(1)).collect();
        bar.finish_and_clear();
        Ok(score)
    }
}

fn log_timing(metric: MetricKind, start: Instant) {
    log::debug!("{} took {} ms", metric.label(), start.elapsed().as_millis());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use image::{GrayImage, Luma};
    use tempfile::TempDir;

    struct MeanFeatures;

    impl FeatureExtractor for MeanFeatures {
        fn name(&self) -> &str {
            "mean"
        }

        fn extract_features(&self, image: &LinearImage) -> Result<Vec<f32>> {
            Ok(vec![image.data().mean().unwrap_or(0.0)])
        }
    }

    fn ramp(size: usize) -> LinearImage {
        LinearImage::from_fn(size, size, 1, |y, x, _| ((y * 5 + x * 3) % 11) as f32 / 11.0)
    }

    fn config_with(metrics: &[MetricKind]) -> EvalConfig {
        EvalConfig {
            patch_size: 4,
            metrics: metrics.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_good_candidate_ranks_better() {
        let gt = ramp(16);
        let good = LinearImage::from_fn(16, 16, 1, |y, x, c| (gt.get(y, x, c) + 0.02).min(1.0));
        let bad = LinearImage::filled(16, 16, 1, 0.5);

        let report = Evaluation::new(EvalConfig {
            patch_size: 4,
            ..Default::default()
        })
        .with_feature_extractor(Box::new(MeanFeatures))
        .evaluate(&gt, &bad, &good)
        .unwrap();

        let bad_r = report.pair("bad").unwrap();
        let good_r = report.pair("good").unwrap();

        assert!(good_r.l2.as_ref().unwrap().total() < bad_r.l2.as_ref().unwrap().total());
        assert!(good_r.ssim.as_ref().unwrap().ssim > bad_r.ssim.as_ref().unwrap().ssim);
        assert!(good_r.psnr.as_ref().unwrap().psnr_db > bad_r.psnr.as_ref().unwrap().psnr_db);
        assert!(
            good_r.pattern_match.as_ref().unwrap().total_ssd
                < bad_r.pattern_match.as_ref().unwrap().total_ssd
        );
        assert!(good_r.vgg19.is_some());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_identity_scores() {
        let gt = ramp(12);
        let report = Evaluation::new(config_with(&MetricKind::ALL))
            .with_feature_extractor(Box::new(MeanFeatures))
            .evaluate(&gt, &gt, &gt)
            .unwrap();

        for pair in &report.pairs {
            assert!(pair.l2.as_ref().unwrap().is_zero());
            assert!(pair.fft_l2.as_ref().unwrap().is_zero());
            assert!((pair.ssim.as_ref().unwrap().ssim - 1.0).abs() < 1e-9);
            assert!(pair.psnr.as_ref().unwrap().psnr_db.is_infinite());
            assert_eq!(pair.vgg19.as_ref().unwrap().distance, 0.0);
            assert_eq!(pair.pattern_match.as_ref().unwrap().total_ssd, 0.0);
        }
    }

    #[test]
    fn test_missing_extractor_skips_vgg() {
        let gt = ramp(8);
        let report = Evaluation::new(config_with(&[MetricKind::L2, MetricKind::Vgg19]))
            .evaluate(&gt, &gt, &gt)
            .unwrap();

        assert_eq!(report.skipped, vec![MetricKind::Vgg19]);
        let text = report.to_string();
        assert!(text.contains("VGG19 feature distance (lower is better):\n  skipped"));
    }

    #[test]
    fn test_report_order_and_hints() {
        let gt = ramp(8);
        let report = Evaluation::new(config_with(&[
            MetricKind::PatternMatch,
            MetricKind::Psnr,
            MetricKind::L2,
        ]))
        .evaluate(&gt, &gt, &gt)
        .unwrap();

        let text = report.to_string();
        let l2 = text.find("L2 distance (lower is better)").unwrap();
        let psnr = text.find("PSNR (higher is better)").unwrap();
        let pattern = text.find("Pattern match SSD (lower is better)").unwrap();
        assert!(l2 < psnr && psnr < pattern);
        assert!(text.contains("  bad   [0.000000]"));
        assert!(!text.contains("SSIM"));
    }

    #[test]
    fn test_shape_mismatch_aborts() {
        let gt = ramp(8);
        let other = ramp(6);
        let result = Evaluation::new(config_with(&MetricKind::ALL)).evaluate(&gt, &other, &gt);
        assert!(matches!(result, Err(EvalError::ShapeMismatch(_))));
    }

    #[test]
    fn test_json_report() {
        let gt = ramp(8);
        let report = Evaluation::new(config_with(&[MetricKind::Psnr, MetricKind::Ssim]))
            .evaluate(&gt, &gt, &gt)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["metrics"][0], "ssim");
        assert_eq!(json["pairs"][1]["candidate"], "good");
        assert!(json["pairs"][0]["psnr"]["psnr_db"].is_null());
        assert!(json["pairs"][0]["l2"].is_null());
    }

    #[test]
    fn test_run_from_disk_writes_visualizations() {
        let dir = TempDir::new().unwrap();
        let gt = GrayImage::from_fn(16, 16, |x, y| Luma([((x * 13 + y * 7) % 256) as u8]));
        let bad = GrayImage::from_pixel(16, 16, Luma([90]));
        gt.save(dir.path().join("gt.png")).unwrap();
        bad.save(dir.path().join("bad.png")).unwrap();
        gt.save(dir.path().join("good.png")).unwrap();

        let fft_output = dir.path().join("gt_fft.png");
        let match_output = dir.path().join("matches.png");
        let config = EvalConfig {
            capture_dir: dir.path().to_path_buf(),
            patch_size: 4,
            fft_output: Some(fft_output.clone()),
            match_output: Some(match_output.clone()),
            metrics: vec![MetricKind::L2, MetricKind::FftL2, MetricKind::PatternMatch],
            ..Default::default()
        };

        let report = Evaluation::new(config).run().unwrap();
        assert_eq!(report.ground_truth, Some(dir.path().join("gt.png")));
        assert!(report.pair("good").unwrap().l2.as_ref().unwrap().is_zero());
        assert!(!report.pair("bad").unwrap().l2.as_ref().unwrap().is_zero());

        let spectrum = image::open(&fft_output).unwrap();
        assert_eq!(spectrum.width(), 16);
        assert!(match_output.exists());
    }

    #[test]
    fn test_run_missing_capture_fails() {
        let dir = TempDir::new().unwrap();
        let config = EvalConfig {
            capture_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let result = Evaluation::new(config).run();
        assert!(matches!(result, Err(EvalError::Image(_))));
    }
}
