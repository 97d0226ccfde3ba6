//! Render planning for the vertical reel.
//!
//! Everything here is pure: it turns probed source facts and a few settings
//! into the numbers the ffmpeg invocation needs. Output is always 9:16 at
//! 1080×1920.

use rand::Rng;

/// Target aspect as `(width, height)`.
pub const TARGET_ASPECT: (u64, u64) = (9, 16);
pub const OUTPUT_WIDTH: u32 = 1080;
pub const OUTPUT_HEIGHT: u32 = 1920;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipDuration {
    Fixed(f64),
    /// Uniform pick in `[min, max]` per run.
    Range { min: f64, max: f64 },
}

impl ClipDuration {
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            ClipDuration::Fixed(secs) => secs,
            ClipDuration::Range { min, max } if max > min => round_millis(rng.gen_range(min..=max)),
            ClipDuration::Range { min, .. } => min,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropMode {
    /// Source is wider than 9:16; trim left and right.
    CenterCropWidth,
    /// Source is narrower than 9:16; trim top and bottom.
    CenterCropHeight,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    pub mode: CropMode,
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// Centered crop of a `src_w`×`src_h` frame down to 9:16.
///
/// The axis comes from comparing `w/h` to `9/16` in integers. Cropped sizes
/// are rounded down to even values for yuv420p.
pub fn crop_for(src_w: u32, src_h: u32) -> CropGeometry {
    let (aw, ah) = TARGET_ASPECT;
    let (w, h) = (src_w as u64, src_h as u64);

    match (w * ah).cmp(&(h * aw)) {
        std::cmp::Ordering::Greater => {
            let cw = make_even(h * aw / ah).min(w);
            CropGeometry {
                mode: CropMode::CenterCropWidth,
                width: cw as u32,
                height: src_h,
                x: ((w - cw) / 2) as u32,
                y: 0,
            }
        }
        std::cmp::Ordering::Less => {
            let ch = make_even(w * ah / aw).min(h);
            CropGeometry {
                mode: CropMode::CenterCropHeight,
                width: src_w,
                height: ch as u32,
                x: 0,
                y: ((h - ch) / 2) as u32,
            }
        }
        std::cmp::Ordering::Equal => CropGeometry {
            mode: CropMode::None,
            width: src_w,
            height: src_h,
            x: 0,
            y: 0,
        },
    }
}

fn make_even(value: u64) -> u64 {
    ((value / 2) * 2).max(2)
}

fn round_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// Slice of the source that ends up in the reel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub duration: f64,
    /// Source is shorter than `duration` and has to be repeated.
    pub loop_video: bool,
}

/// Picks a start offset in `[0, max_start_offset]` that still leaves
/// `duration` seconds of source. Sources shorter than `duration` start at 0
/// and loop.
pub fn plan_window<R: Rng + ?Sized>(
    source_duration: f64,
    duration: f64,
    max_start_offset: f64,
    rng: &mut R,
) -> TimeWindow {
    if source_duration < duration {
        return TimeWindow {
            start: 0.0,
            duration,
            loop_video: true,
        };
    }

    let slack = source_duration - duration;
    let max_start = max_start_offset.max(0.0).min(slack);
    let start = if max_start > 0.0 {
        // floor so the rounded offset never eats into the window
        ((rng.gen_range(0.0..=max_start)) * 1000.0).floor() / 1000.0
    } else {
        0.0
    };

    TimeWindow {
        start,
        duration,
        loop_video: false,
    }
}

/// Extra plays of the audio needed to cover `target` seconds.
///
/// Zero when the track is already long enough; it is then only truncated.
pub fn audio_loops(audio_duration: f64, target: f64) -> u32 {
    if audio_duration <= 0.0 || audio_duration >= target {
        return 0;
    }
    ((target / audio_duration).ceil() as u32).saturating_sub(1)
}

/// Length of the audio after looping and truncating to `target`.
pub fn audio_output_duration(audio_duration: f64, target: f64) -> f64 {
    let covered = audio_duration * (audio_loops(audio_duration, target) + 1) as f64;
    covered.min(target)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSpec {
    pub window: TimeWindow,
    pub crop: CropGeometry,
    pub output_width: u32,
    pub output_height: u32,
    pub audio_loops: u32,
}

impl RenderSpec {
    pub fn target_duration(&self) -> f64 {
        self.window.duration
    }

    pub fn video_filter(&self) -> String {
        let scale = format!(
            "scale={}:{}:flags=lanczos,setsar=1",
            self.output_width, self.output_height
        );
        match self.crop.mode {
            CropMode::None => scale,
            _ => format!(
                "crop={}:{}:{}:{},{}",
                self.crop.width, self.crop.height, self.crop.x, self.crop.y, scale
            ),
        }
    }

    pub fn audio_filter(&self) -> String {
        format!("atrim=duration={:.3},asetpts=PTS-STARTPTS", self.target_duration())
    }
}

pub fn plan_render<R: Rng + ?Sized>(
    source: SourceInfo,
    audio_duration: f64,
    clip: ClipDuration,
    max_start_offset: f64,
    rng: &mut R,
) -> RenderSpec {
    let duration = clip.pick(rng);
    RenderSpec {
        window: plan_window(source.duration, duration, max_start_offset, rng),
        crop: crop_for(source.width, source.height),
        output_width: OUTPUT_WIDTH,
        output_height: OUTPUT_HEIGHT,
        audio_loops: audio_loops(audio_duration, duration),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ratio_close_to_target(w: u32, h: u32) -> bool {
        // within one even-pixel step of 9:16
        let exact = h as f64 * 9.0 / 16.0;
        (w as f64 - exact).abs() <= 2.0
    }

    #[test]
    fn four_by_three_is_wider_than_portrait() {
        let crop = crop_for(1440, 1080);
        assert_eq!(crop.mode, CropMode::CenterCropWidth);
        assert_eq!(crop.height, 1080);
        assert_eq!(crop.width, 606);
        assert_eq!(crop.x, (1440 - 606) / 2);
        assert_eq!(crop.y, 0);
    }

    #[test]
    fn landscape_hd_crops_left_and_right() {
        let crop = crop_for(1920, 1080);
        assert_eq!(crop.mode, CropMode::CenterCropWidth);
        assert!(ratio_close_to_target(crop.width, crop.height));
        assert_eq!(crop.x * 2 + crop.width, 1920);
    }

    #[test]
    fn tall_source_crops_top_and_bottom() {
        let crop = crop_for(1080, 2400);
        assert_eq!(crop.mode, CropMode::CenterCropHeight);
        assert_eq!(crop.width, 1080);
        assert_eq!(crop.height, 1920);
        assert_eq!(crop.y, 240);
        assert_eq!(crop.x, 0);
    }

    #[test]
    fn exact_portrait_is_left_alone() {
        let crop = crop_for(720, 1280);
        assert_eq!(crop.mode, CropMode::None);
        assert_eq!((crop.width, crop.height), (720, 1280));
    }

    #[test]
    fn short_audio_loops_then_truncates() {
        assert_eq!(audio_loops(3.0, 8.0), 2);
        assert_eq!(audio_output_duration(3.0, 8.0), 8.0);
        assert_eq!(audio_loops(4.0, 8.0), 1);
        assert_eq!(audio_output_duration(4.0, 8.0), 8.0);
    }

    #[test]
    fn long_audio_is_truncated_without_looping() {
        assert_eq!(audio_loops(30.0, 8.0), 0);
        assert_eq!(audio_output_duration(30.0, 8.0), 8.0);
        assert_eq!(audio_loops(8.0, 8.0), 0);
    }

    #[test]
    fn window_fits_inside_source() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let w = plan_window(10.5, 9.0, 2.0, &mut rng);
            assert!(!w.loop_video);
            assert!(w.start >= 0.0 && w.start <= 1.5);
            assert!(w.start + w.duration <= 10.5);
        }
    }

    #[test]
    fn short_source_loops_from_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let w = plan_window(5.0, 8.0, 2.0, &mut rng);
        assert_eq!(w, TimeWindow { start: 0.0, duration: 8.0, loop_video: true });
    }

    #[test]
    fn randomized_duration_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let clip = ClipDuration::Range { min: 8.0, max: 10.0 };
        for _ in 0..200 {
            let d = clip.pick(&mut rng);
            assert!((8.0..=10.0).contains(&d));
        }
        assert_eq!(ClipDuration::Fixed(7.5).pick(&mut rng), 7.5);
    }

    #[test]
    fn plan_produces_portrait_filter() {
        let mut rng = StdRng::seed_from_u64(11);
        let spec = plan_render(
            SourceInfo { width: 1920, height: 1080, duration: 20.0 },
            3.0,
            ClipDuration::Fixed(7.5),
            2.0,
            &mut rng,
        );
        assert_eq!(spec.target_duration(), 7.5);
        assert_eq!(spec.audio_loops, 2);
        assert_eq!(
            spec.video_filter(),
            "crop=606:1080:657:0,scale=1080:1920:flags=lanczos,setsar=1"
        );
        assert_eq!(spec.audio_filter(), "atrim=duration=7.500,asetpts=PTS-STARTPTS");
        assert_eq!(spec.output_width * 16, spec.output_height * 9);
    }
}
