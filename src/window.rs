//! Clip window selection: platform clip length plus a randomized start offset
//! that skips the opening of the video.
//!
//! This is the only place where the source duration is validated. A
//! [`ClipWindow`] can only be obtained from [`select_window`], so every window
//! handed to the extractor satisfies `start + clip <= total`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::AppError;
use crate::platform::Platform;

/// Seconds skipped at the start of every video to avoid intros.
pub const DEFAULT_MIN_START_SECS: u64 = 30;

/// Source of start offsets. Returns a value in the inclusive range `[min, max]`.
pub trait OffsetSource: Send + Sync {
    fn pick(&self, min: u64, max: u64) -> Result<u64, AppError>;
}

/// Uniform draw from a CSPRNG freshly seeded by the operating system, so
/// offsets cannot be predicted. An unavailable OS entropy source is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureOffsetSource;

impl OffsetSource for SecureOffsetSource {
    fn pick(&self, min: u64, max: u64) -> Result<u64, AppError> {
        let mut rng = StdRng::try_from_os_rng().map_err(|e| {
            AppError::Io(std::io::Error::other(format!(
                "OS random source unavailable: {}",
                e
            )))
        })?;
        Ok(rng.random_range(min..=max))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipWindow {
    clip_duration: u32,
    start_offset: u64,
}

impl ClipWindow {
    pub fn clip_duration_secs(&self) -> u32 {
        self.clip_duration
    }

    pub fn start_offset_secs(&self) -> u64 {
        self.start_offset
    }

    pub fn end_secs(&self) -> u64 {
        self.start_offset + u64::from(self.clip_duration)
    }
}

/// Pick the extraction window for a video of `total_duration` seconds.
///
/// Fails with [`AppError::InsufficientDuration`] when the video cannot hold the
/// platform clip after skipping `min_start` seconds, i.e. unless
/// `floor(total - clip) > min_start`.
pub fn select_window(
    total_duration: f64,
    platform: Platform,
    min_start: u64,
    offsets: &dyn OffsetSource,
) -> Result<ClipWindow, AppError> {
    let clip_duration = platform.clip_duration_secs();
    let insufficient = || AppError::InsufficientDuration {
        total_duration,
        clip_duration,
    };

    if !total_duration.is_finite() || total_duration <= f64::from(clip_duration) {
        return Err(insufficient());
    }

    let max_start = (total_duration - f64::from(clip_duration)).floor() as u64;
    if max_start <= min_start {
        log::debug!(
            target: "autoclip::window",
            "No room after intro skip: total={}, clip={}, min_start={}, max_start={}",
            total_duration,
            clip_duration,
            min_start,
            max_start
        );
        return Err(insufficient());
    }

    let picked = offsets.pick(min_start, max_start)?;
    let start_offset = picked.clamp(min_start, max_start);
    if start_offset != picked {
        log::warn!(
            target: "autoclip::window",
            "Offset source returned {} outside [{}, {}]; clamped",
            picked,
            min_start,
            max_start
        );
    }

    Ok(ClipWindow {
        clip_duration,
        start_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixedOffsetSource;

    fn secure(total: f64, platform: Platform) -> Result<ClipWindow, AppError> {
        select_window(total, platform, DEFAULT_MIN_START_SECS, &SecureOffsetSource)
    }

    #[test]
    fn too_short_for_intro_skip_fails_closed() {
        // 200 - 180 = 20 < 30
        let err = secure(200.0, Platform::YouTube).unwrap_err();
        match err {
            AppError::InsufficientDuration {
                total_duration,
                clip_duration,
            } => {
                assert_eq!(total_duration, 200.0);
                assert_eq!(clip_duration, 180);
            }
            other => panic!("expected InsufficientDuration, got {:?}", other),
        }
    }

    #[test]
    fn instagram_window_within_bounds() {
        let source = FixedOffsetSource::lowest();
        let window = select_window(300.0, Platform::Instagram, 30, &source).unwrap();
        assert_eq!(source.last_range(), Some((30, 240)));
        assert_eq!(window.clip_duration_secs(), 60);
        assert_eq!(window.start_offset_secs(), 30);

        let source = FixedOffsetSource::highest();
        let window = select_window(300.0, Platform::Instagram, 30, &source).unwrap();
        assert_eq!(window.start_offset_secs(), 240);
        assert_eq!(window.end_secs(), 300);
    }

    #[test]
    fn shorter_than_clip_fails_immediately() {
        let source = FixedOffsetSource::lowest();
        let err = select_window(45.0, Platform::Instagram, 30, &source).unwrap_err();
        assert!(matches!(err, AppError::InsufficientDuration { .. }));
        assert_eq!(source.last_range(), None, "offset source must not be consulted");
    }

    #[test]
    fn exactly_clip_length_fails() {
        assert!(secure(60.0, Platform::Instagram).is_err());
        assert!(secure(180.0, Platform::YouTube).is_err());
    }

    #[test]
    fn max_start_equal_to_min_start_fails() {
        // floor(90 - 60) = 30 == min_start
        assert!(secure(90.0, Platform::Instagram).is_err());
        assert!(secure(90.9, Platform::Instagram).is_err());
    }

    #[test]
    fn one_second_past_min_start_succeeds() {
        let window = secure(91.0, Platform::Instagram).unwrap();
        assert!((30..=31).contains(&window.start_offset_secs()));
    }

    #[test]
    fn fractional_duration_floors_max_start() {
        let source = FixedOffsetSource::highest();
        let window = select_window(250.7, Platform::YouTube, 30, &source).unwrap();
        assert_eq!(window.start_offset_secs(), 70);
        assert!(window.end_secs() as f64 <= 250.7);
    }

    #[test]
    fn non_finite_duration_is_insufficient() {
        assert!(secure(f64::NAN, Platform::YouTube).is_err());
        assert!(secure(f64::INFINITY, Platform::YouTube).is_err());
        assert!(secure(-5.0, Platform::Instagram).is_err());
    }

    #[test]
    fn out_of_range_source_is_clamped() {
        let source = FixedOffsetSource::new(10_000);
        let window = select_window(300.0, Platform::Instagram, 30, &source).unwrap();
        assert_eq!(window.start_offset_secs(), 240);
    }

    struct NoEntropy;

    impl OffsetSource for NoEntropy {
        fn pick(&self, _min: u64, _max: u64) -> Result<u64, AppError> {
            Err(AppError::Io(std::io::Error::other("getrandom failed")))
        }
    }

    #[test]
    fn random_source_failure_is_internal_error() {
        let err = select_window(300.0, Platform::Instagram, 30, &NoEntropy).unwrap_err();
        assert!(matches!(err, AppError::Io(_)), "got {:?}", err);
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }

    #[test]
    fn custom_min_start_is_respected() {
        let source = FixedOffsetSource::lowest();
        let window = select_window(300.0, Platform::Instagram, 0, &source).unwrap();
        assert_eq!(window.start_offset_secs(), 0);
    }

    #[test]
    fn invariant_holds_across_durations() {
        for platform in Platform::ALL {
            let clip = f64::from(platform.clip_duration_secs());
            let mut total = 0.0;
            while total < 1_000.0 {
                match secure(total, platform) {
                    Ok(w) => {
                        assert!(w.start_offset_secs() >= DEFAULT_MIN_START_SECS);
                        assert!(w.end_secs() as f64 <= total, "total={}, w={:?}", total, w);
                    }
                    Err(AppError::InsufficientDuration { .. }) => {
                        assert!(total - clip < DEFAULT_MIN_START_SECS as f64 + 1.0);
                    }
                    Err(other) => panic!("unexpected error {:?}", other),
                }
                total += 7.3;
            }
        }
    }

    #[test]
    fn secure_offsets_are_roughly_uniform() {
        // 10 buckets, 20k draws: each bucket expects 2000 (sd ~42).
        let mut counts = [0u32; 10];
        for _ in 0..20_000 {
            let v = SecureOffsetSource.pick(30, 39).unwrap();
            assert!((30..=39).contains(&v));
            counts[(v - 30) as usize] += 1;
        }
        for (i, c) in counts.iter().enumerate() {
            assert!(
                (1_700..=2_300).contains(c),
                "bucket {} has {} draws: {:?}",
                i,
                c,
                counts
            );
        }
    }

    #[test]
    fn secure_offsets_are_not_constant() {
        let draws: std::collections::HashSet<u64> = (0..64)
            .map(|_| secure(300.0, Platform::Instagram).unwrap().start_offset_secs())
            .collect();
        assert!(draws.len() > 1);
    }
}
