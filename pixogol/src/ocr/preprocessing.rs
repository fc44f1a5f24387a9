use crate::config::OcrConfig;
use crate::error::{PixogolError, Result};
use image::metadata::Orientation;
use image::{
    DynamicImage, GenericImageView, GrayImage, ImageDecoder, ImageFormat, ImageReader, Luma, Rgb,
};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;

/// Roughly the spread of a 5x5 Gaussian kernel.
const BLUR_SIGMA: f32 = 1.1;

/// Preprocess image bytes for a local OCR engine
///
/// Applies the following transformations:
/// 1. Decodes and applies EXIF orientation
/// 2. Validates image dimensions (min check)
/// 3. Resizes large images while maintaining aspect ratio
/// 4. Flattens transparency onto white and converts to grayscale
/// 5. Gaussian blur, Otsu binary threshold and a 3x3 morphological close
///
/// Returns PNG bytes ready for the OCR engine.
pub fn preprocess_image(bytes: &[u8], config: &OcrConfig) -> Result<Vec<u8>> {
    let img = prepare(bytes, config)?;
    let gray = flatten_alpha(img).to_luma8();
    let binary = binarize(gray);
    encode_png(&DynamicImage::ImageLuma8(binary))
}

/// Decode, orient and bound the image without altering its colours.
///
/// Used for vision-model backends, which read colour images better than
/// thresholded ones.
pub fn normalize_image(bytes: &[u8], config: &OcrConfig) -> Result<Vec<u8>> {
    let img = prepare(bytes, config)?;
    encode_png(&img)
}

fn prepare(bytes: &[u8], config: &OcrConfig) -> Result<DynamicImage> {
    let img = decode_oriented(bytes)?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(PixogolError::Validation(format!(
            "Image too small: {}x{}, minimum {}x{}",
            width, height, config.min_image_dimension, config.min_image_dimension
        )));
    }

    Ok(resize_if_needed(img, config.max_image_dimension))
}

fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PixogolError::Validation(format!("Failed to read image: {e}")))?;

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| PixogolError::Validation(format!("Failed to decode image: {e}")))?;
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);

    let mut img = DynamicImage::from_decoder(decoder)
        .map_err(|e| PixogolError::Validation(format!("Failed to decode image: {e}")))?;
    img.apply_orientation(orientation);

    Ok(img)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| PixogolError::Processing(format!("Failed to encode image: {e}")))?;
    Ok(output)
}

/// Resize image if it exceeds maximum dimension while maintaining aspect ratio
///
/// Uses Lanczos3 filter for high-quality downscaling
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = if width > height {
        max_dim as f32 / width as f32
    } else {
        max_dim as f32 / height as f32
    };

    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

/// Composite transparent pixels onto a white background.
///
/// Text on transparent PNGs is usually drawn over fully transparent black,
/// which would otherwise turn into a black page.
fn flatten_alpha(img: DynamicImage) -> DynamicImage {
    fn blend(channel: u8, alpha: u8) -> u8 {
        let a = alpha as u16;
        ((channel as u16 * a + 255 * (255 - a)) / 255) as u8
    }

    match img {
        DynamicImage::ImageRgba8(rgba) => DynamicImage::ImageRgb8(image::RgbImage::from_fn(
            rgba.width(),
            rgba.height(),
            |x, y| {
                let p = rgba.get_pixel(x, y);
                Rgb([blend(p[0], p[3]), blend(p[1], p[3]), blend(p[2], p[3])])
            },
        )),
        DynamicImage::ImageLumaA8(luma_a) => DynamicImage::ImageLuma8(GrayImage::from_fn(
            luma_a.width(),
            luma_a.height(),
            |x, y| {
                let p = luma_a.get_pixel(x, y);
                Luma([blend(p[0], p[1])])
            },
        )),
        other if other.color().has_alpha() => flatten_alpha(DynamicImage::ImageRgba8(other.to_rgba8())),
        other => other,
    }
}

fn binarize(gray: GrayImage) -> GrayImage {
    // A single-colour image has no foreground to separate.
    if is_flat(&gray) {
        return gray;
    }

    let blurred = imageproc::filter::gaussian_blur_f32(&gray, BLUR_SIGMA);
    let level = otsu_level(&blurred);
    let binary = threshold(&blurred, level, ThresholdType::Binary);
    imageproc::morphology::close(&binary, Norm::LInf, 1)
}

fn is_flat(gray: &GrayImage) -> bool {
    let mut pixels = gray.pixels();
    match pixels.next() {
        Some(first) => pixels.all(|p| p[0] == first[0]),
        None => true,
    }
}
