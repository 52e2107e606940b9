//! Styled map rendering from coverage values to encoded images.

use image::GenericImageView;
use renderer::{apply_style, blend_over, create_png_auto, encode_jpeg, fill, render_legend};
use test_utils::{banded_style, terrain_style};

/// PNG IHDR colour type byte.
const IHDR_COLOR_TYPE: usize = 25;

fn decode(bytes: &[u8]) -> image::RgbaImage {
    image::load_from_memory(bytes).expect("decodable image").to_rgba8()
}

// ============================================================================
// Styling
// ============================================================================

#[test]
fn test_terrain_ramp_colors() {
    let values = [0.0, 500.0, 1000.0, f32::NAN];
    let rgba = apply_style(&terrain_style(), &values);
    let png = create_png_auto(&rgba, 4, 1).unwrap();
    let img = decode(&png);

    assert_eq!(img.get_pixel(0, 0).0, [0, 128, 0, 255]);
    assert_eq!(img.get_pixel(1, 0).0, [200, 180, 60, 255]);
    assert_eq!(img.get_pixel(2, 0).0, [120, 70, 20, 255]);
    assert_eq!(img.get_pixel(3, 0).0[3], 0);
}

#[test]
fn test_values_outside_the_ramp_are_transparent() {
    let rgba = apply_style(&terrain_style(), &[-1.0, 1000.5]);
    assert_eq!(rgba[3], 0);
    assert_eq!(rgba[7], 0);
}

#[test]
fn test_step_style_uses_lower_band() {
    let rgba = apply_style(&banded_style(), &[100.0, 400.0, 5000.0]);
    assert_eq!(&rgba[0..4], &[0, 0, 255, 255]);
    assert_eq!(&rgba[4..8], &[0, 255, 0, 255]);
    // step styles extend past the last stop
    assert_eq!(&rgba[8..12], &[255, 0, 0, 255]);
}

#[test]
fn test_large_coverage_styles_every_value() {
    let values: Vec<f32> = (0..512 * 512).map(|i| (i % 1000) as f32).collect();
    let rgba = apply_style(&terrain_style(), &values);
    assert_eq!(rgba.len(), values.len() * 4);
    assert!(rgba.chunks_exact(4).all(|px| px[3] == 255));
}

// ============================================================================
// Compositing
// ============================================================================

#[test]
fn test_upper_layer_gaps_show_lower_layer() {
    let (w, h) = (8, 8);
    let mut canvas = fill(w, h, [0, 0, 0, 0]);

    let bottom = apply_style(&terrain_style(), &vec![0.0; w * h]);
    blend_over(&mut canvas, &bottom);

    // top layer only has data in the left half
    let top_values: Vec<f32> = (0..w * h)
        .map(|i| if i % w < w / 2 { 400.0 } else { f32::NAN })
        .collect();
    blend_over(&mut canvas, &apply_style(&banded_style(), &top_values));

    let img = decode(&create_png_auto(&canvas, w, h).unwrap());
    assert_eq!(img.get_pixel(0, 3).0, [0, 255, 0, 255]);
    assert_eq!(img.get_pixel(7, 3).0, [0, 128, 0, 255]);
}

#[test]
fn test_opaque_background_under_no_data() {
    let mut canvas = fill(4, 4, [255, 255, 255, 255]);
    blend_over(&mut canvas, &apply_style(&terrain_style(), &[f32::NAN; 16]));
    assert!(canvas.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_styled_map_uses_palette() {
    let rgba = apply_style(&banded_style(), &[100.0; 64]);
    let png = create_png_auto(&rgba, 8, 8).unwrap();
    assert_eq!(png[IHDR_COLOR_TYPE], 3);
}

#[test]
fn test_many_colors_fall_back_to_rgba() {
    let pixels: Vec<u8> = (0..32u32 * 32)
        .flat_map(|i| [(i % 256) as u8, (i / 256) as u8 * 40, 7, 255])
        .collect();
    let png = create_png_auto(&pixels, 32, 32).unwrap();
    assert_eq!(png[IHDR_COLOR_TYPE], 6);
    assert_eq!(decode(&png).dimensions(), (32, 32));
}

#[test]
fn test_jpeg_of_styled_map() {
    let rgba = apply_style(&terrain_style(), &vec![250.0; 20 * 10]);
    let jpeg = encode_jpeg(&rgba, 20, 10, [255, 255, 255, 255]).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    assert_eq!(decode(&jpeg).dimensions(), (20, 10));
}

#[test]
fn test_legend_encodes_at_requested_size() {
    let legend = render_legend(&terrain_style(), 30, 90);
    let png = create_png_auto(&legend, 30, 90).unwrap();
    assert_eq!(decode(&png).dimensions(), (30, 90));
}
