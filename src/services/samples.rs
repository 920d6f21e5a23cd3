use ab_glyph::{FontRef, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use log::{debug, info};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::models::BenchError;

const FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const INK: Rgb<u8> = Rgb([10, 10, 10]);
const HIGHLIGHT: Rgb<u8> = Rgb([200, 30, 30]);
const FIGURE_BORDER: i32 = 4;

/// Synthesizes the JPEG documents the benchmark sends to the OCR endpoint.
pub struct SampleGenerator {
    samples_dir: PathBuf,
    font: FontRef<'static>,
}

impl SampleGenerator {
    pub fn new(samples_dir: impl Into<PathBuf>) -> Result<Self, BenchError> {
        let samples_dir = samples_dir.into();
        let font = FontRef::try_from_slice(FONT_DATA).map_err(|e| BenchError::Sample {
            path: samples_dir.clone(),
            message: format!("embedded font is invalid: {}", e),
        })?;
        Ok(Self { samples_dir, font })
    }

    pub fn sample_path(&self, index: usize) -> PathBuf {
        self.samples_dir.join(
            constants::SAMPLE_FILE_PATTERN.replace("{index}", &(index + 1).to_string()),
        )
    }

    /// Returns paths for samples `0..count`, creating only the missing ones.
    pub fn generate_samples(&self, count: usize) -> Result<Vec<PathBuf>, BenchError> {
        fs::create_dir_all(&self.samples_dir).map_err(|source| BenchError::Write {
            path: self.samples_dir.clone(),
            source,
        })?;

        let mut paths = Vec::with_capacity(count);
        let mut created = 0;
        for index in 0..count {
            let path = self.sample_path(index);
            if path.exists() {
                debug!("Sample {:?} already present", path);
            } else {
                self.write_sample(&path, index)?;
                created += 1;
            }
            paths.push(path);
        }

        info!(
            "{} samples in {:?} ({} created)",
            paths.len(),
            self.samples_dir,
            created
        );
        Ok(paths)
    }

    /// Draws sample `index`: a title, six numbered lines and a framed figure.
    pub fn render(&self, index: usize) -> RgbImage {
        let mut img = RgbImage::from_pixel(
            constants::SAMPLE_WIDTH,
            constants::SAMPLE_HEIGHT,
            Rgb([255, 255, 255]),
        );
        let scale = PxScale::from(28.0);

        draw_text_mut(
            &mut img,
            BLACK,
            20,
            20,
            scale,
            &self.font,
            &format!("Sample #{} - OCR test", index + 1),
        );

        for line in 0..6 {
            let y = 80 + line as i32 * 60;
            let text = format!(
                "Line {} of the test document. Value: {}",
                line + 1,
                index * 100 + line
            );
            draw_text_mut(&mut img, INK, 30, y, scale, &self.font, &text);
        }

        // 550,50 .. 760,200 inclusive
        for inset in 0..FIGURE_BORDER {
            let rect = Rect::at(550 + inset, 50 + inset)
                .of_size((211 - 2 * inset) as u32, (151 - 2 * inset) as u32);
            draw_hollow_rect_mut(&mut img, rect, HIGHLIGHT);
        }
        draw_text_mut(&mut img, HIGHLIGHT, 560, 60, scale, &self.font, "Figure");

        img
    }

    fn write_sample(&self, path: &Path, index: usize) -> Result<(), BenchError> {
        let img = self.render(index);
        let file = File::create(path).map_err(|source| BenchError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);

        JpegEncoder::new_with_quality(&mut writer, constants::SAMPLE_JPEG_QUALITY)
            .encode_image(&img)
            .map_err(|e| BenchError::Sample {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        debug!("Generated sample {:?}", path);
        Ok(())
    }
}
