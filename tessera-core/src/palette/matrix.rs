/// Row-major 3×3 RGB transform
pub type ColorMatrix = [[f32; 3]; 3];

pub(super) const IDENTITY: ColorMatrix = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

// D65 to ~3400K Bradford adaptation
pub(super) const NIGHT: ColorMatrix = [
    [1.2066, 0.3380, 0.0383],
    [-0.0164, 0.8985, 0.0098],
    [-0.0156, -0.0500, 0.4201],
];

pub(super) const DIMMED: ColorMatrix = [[0.25, 0.0, 0.0], [0.0, 0.25, 0.0], [0.0, 0.0, 0.25]];

pub(super) const COOL: ColorMatrix = [[0.9, 0.0, 0.2], [0.0, 1.0, 0.0], [-0.1, 0.0, 1.0]];

pub(super) const WARM: ColorMatrix = [[1.0, 0.0, -0.1], [0.0, 1.0, 0.0], [0.1, 0.0, 0.8]];

pub(super) const PASTEL: ColorMatrix = [[1.2, 0.1, 0.1], [0.1, 1.2, 0.1], [0.1, 0.1, 1.2]];

pub(super) const MOONLIGHT: ColorMatrix = [[0.6, 0.2, 0.4], [0.2, 0.7, 0.2], [0.3, 0.3, 0.9]];

pub(super) const DUSK: ColorMatrix = [[1.1, 0.0, 0.2], [0.0, 0.8, 0.1], [0.0, 0.1, 0.6]];

pub(super) const VINTAGE: ColorMatrix = [[1.1, 0.3, 0.0], [0.0, 0.9, 0.1], [0.0, 0.2, 0.5]];

// Luma weights on every row
pub(super) const MONOCHROME: ColorMatrix =
    [[0.3, 0.59, 0.11], [0.3, 0.59, 0.11], [0.3, 0.59, 0.11]];

pub(super) const SUNRISE: ColorMatrix = [[1.3, 0.2, 0.0], [0.1, 1.1, 0.0], [0.0, 0.1, 0.6]];

pub(super) const CYBER: ColorMatrix = [[1.0, 0.0, 1.2], [0.0, 1.0, 0.5], [0.2, 0.5, 1.2]];

/// Transform an RGBA frame in place
///
/// `pixels` is row-major, 4 bytes per pixel. Only the first
/// `width * height` pixels are touched; each output channel is truncated
/// and clamped into 0-255. Alpha is left as-is.
pub fn apply(pixels: &mut [u8], width: usize, height: usize, matrix: &ColorMatrix) {
    for px in pixels.chunks_exact_mut(4).take(width * height) {
        let r = px[0] as f32;
        let g = px[1] as f32;
        let b = px[2] as f32;

        px[0] = channel(matrix[0], r, g, b);
        px[1] = channel(matrix[1], r, g, b);
        px[2] = channel(matrix[2], r, g, b);
    }
}

#[inline]
fn channel(row: [f32; 3], r: f32, g: f32, b: f32) -> u8 {
    let v = row[0] * r + row[1] * g + row[2] * b;
    v.clamp(0.0, 255.0) as u8
}
