#![allow(dead_code)]

use std::path::{Path, PathBuf};

use oes_core::frame::{Frame, FrameMetadata};

pub const WIDTH: usize = 16;
pub const HEIGHT: usize = 16;

/// Header card value for the synthetic FITS builder.
#[derive(Clone, Copy)]
pub enum Card<'a> {
    Int(&'a str, i64),
    Str(&'a str, &'a str),
    Logical(&'a str, bool),
}

fn render(card: &Card) -> String {
    let line = match card {
        Card::Int(k, v) => format!("{k:<8}= {v:>20}"),
        Card::Str(k, v) => format!("{k:<8}= '{:<8}'", v.replace('\'', "''")),
        Card::Logical(k, v) => format!("{k:<8}= {:>20}", if *v { "T" } else { "F" }),
    };
    format!("{line:<80}")
}

fn pad_to_block(buf: &mut Vec<u8>, fill: u8) {
    while buf.len() % 2880 != 0 {
        buf.push(fill);
    }
}

/// Build a complete FITS file from explicit header cards and raw big-endian
/// data bytes. The cards must include the layout keywords.
pub fn build_fits(cards: &[Card], data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    for card in cards {
        buf.extend_from_slice(render(card).as_bytes());
    }
    buf.extend_from_slice(format!("{:<80}", "END").as_bytes());
    pad_to_block(&mut buf, b' ');
    buf.extend_from_slice(data);
    pad_to_block(&mut buf, 0);
    buf
}

/// Build a 16-bit FITS image the way the instrument writes raw exposures.
pub fn build_fits_i16(width: usize, height: usize, pixels: &[i16], extra: &[Card]) -> Vec<u8> {
    assert_eq!(pixels.len(), width * height);
    let mut cards = vec![
        Card::Logical("SIMPLE", true),
        Card::Int("BITPIX", 16),
        Card::Int("NAXIS", 2),
        Card::Int("NAXIS1", width as i64),
        Card::Int("NAXIS2", height as i64),
    ];
    cards.extend_from_slice(extra);
    let data: Vec<u8> = pixels.iter().flat_map(|p| p.to_be_bytes()).collect();
    build_fits(&cards, &data)
}

pub fn uniform(value: i16) -> Vec<i16> {
    vec![value; WIDTH * HEIGHT]
}

/// Write a raw 16x16 exposure with the given IMAGETYP and optional OBJECT.
pub fn write_exposure(path: &Path, imagetyp: &str, object: Option<&str>, pixels: &[i16]) {
    write_exposure_sized(path, WIDTH, HEIGHT, imagetyp, object, pixels);
}

pub fn write_exposure_sized(
    path: &Path,
    width: usize,
    height: usize,
    imagetyp: &str,
    object: Option<&str>,
    pixels: &[i16],
) {
    let mut extra = vec![
        Card::Str("IMAGETYP", imagetyp),
        Card::Str("DATE-OBS", "2024-03-14"),
        Card::Str("UT", "02:31:07"),
    ];
    if let Some(object) = object {
        extra.push(Card::Str("OBJECT", object));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, build_fits_i16(width, height, pixels, &extra)).unwrap();
}

/// A typical night: 3 zeros (100, 101, 105 ADU), 2 flats (1000 ADU) and
/// 5 exposures of HD12345 (600 ADU, the first with a hot pixel at (8, 8)).
pub fn build_standard_night(root: &Path, name: &str) -> PathBuf {
    let night = root.join(name);
    for (i, level) in [100, 101, 105].into_iter().enumerate() {
        write_exposure(&night.join(format!("zero{i:03}.fits")), "zero", Some("bias"), &uniform(level));
    }
    for i in 0..2 {
        write_exposure(&night.join(format!("flat{i:03}.fits")), "flat", Some("quartz"), &uniform(1000));
    }
    for i in 0..5 {
        let mut pixels = uniform(600);
        if i == 0 {
            pixels[8 * WIDTH + 8] = 5000;
        }
        write_exposure(
            &night.join("HD12345").join(format!("obj{i:03}.fits")),
            "object",
            Some("HD 12345"),
            &pixels,
        );
    }
    night
}

/// Classified frame with no file behind it.
pub fn frame(path: &str, night: &str, imagetyp: &str, object: Option<&str>) -> Frame {
    let metadata = FrameMetadata {
        image_type: Some(imagetyp.to_string()),
        object: object.map(str::to_string),
        ..Default::default()
    };
    Frame::from_metadata(Path::new(path), night, metadata).unwrap()
}

/// Sorted file names directly under `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
