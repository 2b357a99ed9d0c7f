//! Synthetic screens and references for tests.

use crate::adb::mock::MockDevice;
use crate::game_automation::{
    ActionDispatcher, CancelToken, Component, Template, TemplateRegistry, Timings,
};
use image::{GrayImage, Luma};
use std::sync::Arc;

fn noise(x: u32, y: u32, seed: u32) -> u8 {
    let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77) ^ seed.wrapping_mul(0xC2B2_AE3D);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    h = h.wrapping_mul(0x297A_2D39);
    h ^= h >> 15;
    (h % 200 + 30) as u8
}

/// High-frequency texture; different seeds do not correlate.
pub fn textured(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([noise(x, y, seed)]))
}

pub fn solid(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Copy `reference` into `screen` with its top-left corner at `(x, y)`.
pub fn paste(screen: &mut GrayImage, reference: &GrayImage, x: u32, y: u32) {
    image::imageops::replace(screen, reference, x as i64, y as i64);
}

/// Copy `reference` blended with whatever is underneath (`weight` of the
/// reference, 0.0-1.0).
pub fn paste_faded(screen: &mut GrayImage, reference: &GrayImage, x: u32, y: u32, weight: f32) {
    for (rx, ry, p) in reference.enumerate_pixels() {
        let under = screen.get_pixel(x + rx, y + ry)[0] as f32;
        let value = p[0] as f32 * weight + under * (1.0 - weight);
        screen.put_pixel(x + rx, y + ry, Luma([value.round() as u8]));
    }
}

/// Reference image used for `template` in tests; every template gets its
/// own texture.
pub fn reference_for(template: Template) -> GrayImage {
    let seed = 1000 + template.component as u32 * 100 + template.id as u32;
    textured(REF_W, REF_H, seed)
}

pub const REF_W: u32 = 16;
pub const REF_H: u32 = 12;
pub const SCREEN_W: u32 = 160;
pub const SCREEN_H: u32 = 120;

/// Registry holding every template of `components`.
pub fn registry_for(components: &[Component]) -> Arc<TemplateRegistry> {
    let images = components.iter().flat_map(|component| {
        component.templates().iter().map(move |id| {
            let template = component.template(*id);
            (template, reference_for(template))
        })
    });
    Arc::new(TemplateRegistry::from_images(images))
}

/// Background screen with the given templates pasted at their top-left
/// corners.
pub fn screen_with(items: &[(Template, u32, u32)]) -> GrayImage {
    let mut screen = textured(SCREEN_W, SCREEN_H, 4242);
    for (template, x, y) in items {
        paste(&mut screen, &reference_for(*template), *x, *y);
    }
    screen
}

/// Where a tap on a template pasted at `(x, y)` lands.
pub fn center_of(x: u32, y: u32) -> (u32, u32) {
    (x + REF_W / 2, y + REF_H / 2)
}

pub fn dispatcher_for(
    device: MockDevice,
    components: &[Component],
    timings: Timings,
) -> ActionDispatcher<MockDevice> {
    ActionDispatcher::new(device, registry_for(components), timings, CancelToken::new())
}
