//! BC1/BC2/BC3 (DXT1-5) block decompression into B, G, R, A rows.

use crate::ImageDescriptor;

type Block = [[u8; 4]; 16];

pub(crate) fn decode_bc1(data: &[u8], image: &mut ImageDescriptor) {
    decode_blocks(data, 8, image, |block| decode_color(block, false));
}

pub(crate) fn decode_bc2(data: &[u8], image: &mut ImageDescriptor) {
    decode_blocks(data, 16, image, |block| {
        let mut pixels = decode_color(&block[8..16], true);
        let bits = u64::from_le_bytes(block[0..8].try_into().unwrap_or([0; 8]));
        for (i, px) in pixels.iter_mut().enumerate() {
            px[3] = expand4(((bits >> (4 * i)) & 0x0F) as u16);
        }
        pixels
    });
}

pub(crate) fn decode_bc3(data: &[u8], image: &mut ImageDescriptor) {
    decode_blocks(data, 16, image, |block| {
        let mut pixels = decode_color(&block[8..16], true);
        let alphas = alpha_palette(block[0], block[1]);
        let mut bits = [0u8; 8];
        bits[..6].copy_from_slice(&block[2..8]);
        let bits = u64::from_le_bytes(bits);
        for (i, px) in pixels.iter_mut().enumerate() {
            px[3] = alphas[((bits >> (3 * i)) & 0x07) as usize];
        }
        pixels
    });
}

fn decode_blocks(
    data: &[u8],
    block_size: usize,
    image: &mut ImageDescriptor,
    decode: impl Fn(&[u8]) -> Block,
) {
    let width = image.width as usize;
    let height = image.height as usize;
    let blocks_x = width.div_ceil(4);

    for (index, block) in data.chunks_exact(block_size).enumerate() {
        let bx = (index % blocks_x) * 4;
        let by = (index / blocks_x) * 4;
        if by >= height {
            break;
        }
        let pixels = decode(block);
        for (i, px) in pixels.iter().enumerate() {
            let x = bx + i % 4;
            let y = by + i / 4;
            // Edge blocks cover pixels outside the image.
            if x >= width || y >= height {
                continue;
            }
            let out = y * image.stride + x * 4;
            image.pixels[out..out + 4].copy_from_slice(px);
        }
    }
}

fn decode_color(block: &[u8], four_color_only: bool) -> Block {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);

    let e0 = rgb565(c0);
    let e1 = rgb565(c1);
    let mut palette = [[0u8; 4]; 4];
    palette[0] = [e0[0], e0[1], e0[2], 255];
    palette[1] = [e1[0], e1[1], e1[2], 255];
    if four_color_only || c0 > c1 {
        palette[2] = mix(e0, e1, 2, 1, 3);
        palette[3] = mix(e0, e1, 1, 2, 3);
    } else {
        palette[2] = mix(e0, e1, 1, 1, 2);
        // Transparent black.
        palette[3] = [0, 0, 0, 0];
    }

    let mut pixels = [[0u8; 4]; 16];
    for (i, px) in pixels.iter_mut().enumerate() {
        *px = palette[((indices >> (2 * i)) & 0x03) as usize];
    }
    pixels
}

fn mix(a: [u8; 3], b: [u8; 3], wa: u32, wb: u32, div: u32) -> [u8; 4] {
    let c = |i: usize| ((u32::from(a[i]) * wa + u32::from(b[i]) * wb) / div) as u8;
    [c(0), c(1), c(2), 255]
}

fn alpha_palette(a0: u8, a1: u8) -> [u8; 8] {
    let (a0w, a1w) = (u32::from(a0), u32::from(a1));
    let mut out = [0u8; 8];
    out[0] = a0;
    out[1] = a1;
    if a0 > a1 {
        for i in 1..7u32 {
            out[i as usize + 1] = (((7 - i) * a0w + i * a1w) / 7) as u8;
        }
    } else {
        for i in 1..5u32 {
            out[i as usize + 1] = (((5 - i) * a0w + i * a1w) / 5) as u8;
        }
        out[6] = 0;
        out[7] = 255;
    }
    out
}

/// Expands a 565 word to B, G, R.
fn rgb565(word: u16) -> [u8; 3] {
    let r = expand5((word >> 11) & 0x1F);
    let g = expand6((word >> 5) & 0x3F);
    let b = expand5(word & 0x1F);
    [b, g, r]
}

fn expand4(v: u16) -> u8 {
    (u32::from(v) * 17) as u8
}

fn expand5(v: u16) -> u8 {
    ((u32::from(v) * 255 + 15) / 31) as u8
}

fn expand6(v: u16) -> u8 {
    ((u32::from(v) * 255 + 31) / 63) as u8
}
