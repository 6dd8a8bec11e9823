// Prefilters an equirectangular HDR panorama into a small mip chain. Each level
// is blurred a bit more than the previous one, so the PBR shader can pick a
// level by roughness and use the last one as diffuse irradiance.

use rayon::prelude::*;

pub const BASE_WIDTH: u32 = 256;
pub const BASE_HEIGHT: u32 = 128;
pub const SMALLEST_WIDTH: u32 = 8;

const BLUR_KERNEL: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];
// Extra blur passes on the last level; it stands in for irradiance.
const IRRADIANCE_BLUR_PASSES: usize = 4;

type Rgb = [f32; 3];

/// One level of the chain, packed as `Rgb9e5Ufloat` texels.
#[derive(Debug, Clone)]
pub struct EnvironmentMip {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub mips: Vec<EnvironmentMip>,
}

impl EnvironmentMap {
    pub fn from_hdr_bytes(bytes: &[u8]) -> Result<EnvironmentMap, image::ImageError> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Hdr)?;
        let image = image.to_rgb32f();
        let (width, height) = image.dimensions();

        let pixels = image
            .as_raw()
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect::<Vec<Rgb>>();

        Ok(EnvironmentMap::from_pixels(width, height, &pixels))
    }

    pub fn from_pixels(source_width: u32, source_height: u32, pixels: &[Rgb]) -> EnvironmentMap {
        let mut level = resample(source_width, source_height, pixels, BASE_WIDTH, BASE_HEIGHT);
        let (mut width, mut height) = (BASE_WIDTH, BASE_HEIGHT);
        let mut mips = vec![pack_level(width, height, &level)];

        while width > SMALLEST_WIDTH {
            level = blur(width / 2, height / 2, &halve(width, height, &level));
            width /= 2;
            height /= 2;

            if width == SMALLEST_WIDTH {
                for _ in 0..IRRADIANCE_BLUR_PASSES {
                    level = blur(width, height, &level);
                }
            }

            mips.push(pack_level(width, height, &level));
        }

        log::info!(
            "Prefiltered environment: {}x{} source, {} mip levels",
            source_width,
            source_height,
            mips.len()
        );

        EnvironmentMap { mips }
    }

    pub fn base_size(&self) -> (u32, u32) {
        self.mips
            .first()
            .map_or((0, 0), |mip| (mip.width, mip.height))
    }
}

fn pack_level(width: u32, height: u32, pixels: &[Rgb]) -> EnvironmentMip {
    EnvironmentMip {
        width,
        height,
        texels: pixels.par_iter().map(|&rgb| pack_rgb9e5(rgb)).collect(),
    }
}

/// Box-filters `pixels` down (or nearest-samples up) to the target size.
fn resample(
    width: u32,
    height: u32,
    pixels: &[Rgb],
    target_width: u32,
    target_height: u32,
) -> Vec<Rgb> {
    let (width, height) = (width.max(1) as usize, height.max(1) as usize);
    let (target_width, target_height) = (target_width as usize, target_height as usize);

    let span = |index: usize, source: usize, target: usize| {
        let start = index * source / target;
        let end = ((index + 1) * source / target).max(start + 1).min(source);
        start..end
    };

    let mut output = vec![[0.0; 3]; target_width * target_height];

    output
        .par_chunks_mut(target_width)
        .enumerate()
        .for_each(|(y, row)| {
            let rows = span(y, height, target_height);

            for (x, out) in row.iter_mut().enumerate() {
                let columns = span(x, width, target_width);
                let mut sum = [0.0; 3];
                let mut count = 0.0;

                for sy in rows.clone() {
                    for sx in columns.clone() {
                        let Some(p) = pixels.get(sy * width + sx) else {
                            continue;
                        };
                        sum = [sum[0] + p[0], sum[1] + p[1], sum[2] + p[2]];
                        count += 1.0;
                    }
                }

                if count > 0.0 {
                    *out = [sum[0] / count, sum[1] / count, sum[2] / count];
                }
            }
        });

    output
}

fn halve(width: u32, height: u32, pixels: &[Rgb]) -> Vec<Rgb> {
    resample(width, height, pixels, width / 2, height / 2)
}

/// Separable blur: wraps horizontally around the panorama, clamps at the poles.
fn blur(width: u32, height: u32, pixels: &[Rgb]) -> Vec<Rgb> {
    let (width, height) = (width as usize, height as usize);
    let radius = (BLUR_KERNEL.len() / 2) as isize;

    let mut horizontal = vec![[0.0; 3]; width * height];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                for (k, weight) in BLUR_KERNEL.iter().enumerate() {
                    let sx = (x as isize + k as isize - radius).rem_euclid(width as isize);
                    let p = pixels[y * width + sx as usize];
                    for c in 0..3 {
                        out[c] += p[c] * weight;
                    }
                }
            }
        });

    let mut vertical = vec![[0.0; 3]; width * height];
    vertical
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                for (k, weight) in BLUR_KERNEL.iter().enumerate() {
                    let sy = (y as isize + k as isize - radius).clamp(0, height as isize - 1);
                    let p = horizontal[sy as usize * width + x];
                    for c in 0..3 {
                        out[c] += p[c] * weight;
                    }
                }
            }
        });

    vertical
}

const RGB9E5_MANTISSA_BITS: i32 = 9;
const RGB9E5_EXPONENT_BIAS: i32 = 15;
const RGB9E5_MAX_EXPONENT: i32 = 31;
const RGB9E5_MAX_VALUE: f32 = 65408.0;

/// Packs linear RGB into the shared-exponent layout of `Rgb9e5Ufloat`:
/// three 9-bit mantissas in the low bits, a 5-bit exponent on top.
pub fn pack_rgb9e5(rgb: Rgb) -> u32 {
    let [r, g, b] = rgb.map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, RGB9E5_MAX_VALUE) });
    let max = r.max(g).max(b);

    let mut exponent = (max.log2().floor() as i32).max(-RGB9E5_EXPONENT_BIAS - 1)
        + 1
        + RGB9E5_EXPONENT_BIAS;
    let mut scale = 2f32.powi(exponent - RGB9E5_EXPONENT_BIAS - RGB9E5_MANTISSA_BITS);

    if (max / scale + 0.5).floor() as i32 == 1 << RGB9E5_MANTISSA_BITS {
        scale *= 2.0;
        exponent += 1;
    }

    let exponent = exponent.clamp(0, RGB9E5_MAX_EXPONENT) as u32;
    let [r, g, b] = [r, g, b].map(|v| ((v / scale + 0.5).floor() as u32).min(511));

    r | (g << 9) | (b << 18) | (exponent << 27)
}

#[cfg(test)]
fn unpack_rgb9e5(packed: u32) -> Rgb {
    let exponent = (packed >> 27) as i32;
    let scale = 2f32.powi(exponent - RGB9E5_EXPONENT_BIAS - RGB9E5_MANTISSA_BITS);
    [0, 9, 18].map(|shift| ((packed >> shift) & 0x1ff) as f32 * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb9e5_round_trips_representative_values() {
        assert_eq!(pack_rgb9e5([0.0; 3]), 0);
        assert_eq!(unpack_rgb9e5(pack_rgb9e5([1.0, 1.0, 1.0])), [1.0, 1.0, 1.0]);

        let bright = unpack_rgb9e5(pack_rgb9e5([120.0, 3.5, 0.25]));
        assert!((bright[0] - 120.0).abs() / 120.0 < 0.01);
        assert!((bright[1] - 3.5).abs() < 0.25);
    }

    #[test]
    fn rgb9e5_clamps_negative_and_nan() {
        assert_eq!(unpack_rgb9e5(pack_rgb9e5([-1.0, f32::NAN, 0.0])), [0.0; 3]);
        let huge = unpack_rgb9e5(pack_rgb9e5([1.0e9, 0.0, 0.0]));
        assert_eq!(huge[0], RGB9E5_MAX_VALUE);
    }

    #[test]
    fn chain_halves_down_to_smallest_level() {
        let pixels = vec![[0.5, 0.25, 1.0]; 64 * 32];
        let map = EnvironmentMap::from_pixels(64, 32, &pixels);

        assert_eq!(map.base_size(), (BASE_WIDTH, BASE_HEIGHT));
        let sizes = map
            .mips
            .iter()
            .map(|mip| (mip.width, mip.height))
            .collect::<Vec<_>>();
        assert_eq!(
            sizes,
            vec![(256, 128), (128, 64), (64, 32), (32, 16), (16, 8), (8, 4)]
        );

        for mip in &map.mips {
            assert_eq!(mip.texels.len(), (mip.width * mip.height) as usize);
        }
    }

    #[test]
    fn uniform_panorama_stays_uniform() {
        let pixels = vec![[2.0, 2.0, 2.0]; 512 * 256];
        let map = EnvironmentMap::from_pixels(512, 256, &pixels);

        for mip in &map.mips {
            for texel in &mip.texels {
                let [r, g, b] = unpack_rgb9e5(*texel);
                assert!((r - 2.0).abs() < 0.01 && (g - 2.0).abs() < 0.01 && (b - 2.0).abs() < 0.01);
            }
        }
    }

    #[test]
    fn blur_spreads_energy_without_losing_it() {
        let mut pixels = vec![[0.0; 3]; 16 * 8];
        pixels[3 * 16 + 5] = [16.0, 0.0, 0.0];

        let blurred = blur(16, 8, &pixels);
        let total: f32 = blurred.iter().map(|p| p[0]).sum();

        assert!((total - 16.0).abs() < 1e-3);
        assert!(blurred[3 * 16 + 5][0] < 16.0);
        assert!(blurred[3 * 16 + 6][0] > 0.0);
    }
}
