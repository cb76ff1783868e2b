use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::Result;
use crate::frame::Image;
use crate::io::fits::{FitsValue, HeaderCard};

/// Columns left for a string value between its quotes (after `KEYWORD = `).
const MAX_STRING_VALUE: usize = FITS_CARD_SIZE - 10 - 2;

/// Write an image as a single-HDU FITS file with `BITPIX = -32`.
///
/// Descriptive cards from the image header are carried over; the layout
/// keywords are regenerated from the pixel array.
pub fn write_image(image: &Image, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let (height, width) = image.dim();
    let mut cards: Vec<HeaderCard> = vec![
        layout_card("SIMPLE", FitsValue::Logical(true)),
        layout_card("BITPIX", FitsValue::Integer(-32)),
        layout_card("NAXIS", FitsValue::Integer(2)),
        layout_card("NAXIS1", FitsValue::Integer(width as i64)),
        layout_card("NAXIS2", FitsValue::Integer(height as i64)),
    ];
    cards.extend(image.header.descriptive_cards().cloned());

    let mut written = 0;
    for card in &cards {
        writer.write_all(format_card(card).as_bytes())?;
        written += FITS_CARD_SIZE;
    }
    writer.write_all(format!("{:<80}", "END").as_bytes())?;
    written += FITS_CARD_SIZE;
    pad(&mut writer, written, b' ')?;

    for &value in image.data.iter() {
        writer.write_f32::<BigEndian>(value)?;
    }
    pad(&mut writer, image.data.len() * 4, 0)?;

    writer.flush()?;
    Ok(())
}

fn layout_card(keyword: &str, value: FitsValue) -> HeaderCard {
    HeaderCard {
        keyword: keyword.into(),
        value: Some(value),
        comment: None,
    }
}

/// Render one card as exactly 80 ASCII columns.
pub(crate) fn format_card(card: &HeaderCard) -> String {
    let mut line = format!("{:<8}", card.keyword);
    match &card.value {
        None => {
            if let Some(text) = &card.comment {
                line.push_str(text);
            }
        }
        Some(value) => {
            line.push_str("= ");
            match value {
                FitsValue::String(s) => line.push_str(&quoted(s)),
                FitsValue::Integer(i) => line.push_str(&format!("{i:>20}")),
                FitsValue::Float(f) => line.push_str(&format!("{:>20}", format!("{f:?}"))),
                FitsValue::Logical(b) => line.push_str(&format!("{:>20}", if *b { "T" } else { "F" })),
                FitsValue::Undefined => {}
            }
            if let Some(comment) = &card.comment {
                line.push_str(" / ");
                line.push_str(comment);
            }
        }
    }

    let mut line: String = line
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .take(FITS_CARD_SIZE)
        .collect();
    while line.len() < FITS_CARD_SIZE {
        line.push(' ');
    }
    line
}

/// Quote a string value, left-justified to at least 8 characters.
///
/// Values too long for one card are cut before quoting so the closing quote
/// always lands inside column 80; an escaped `''` pair is never split.
fn quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len().min(MAX_STRING_VALUE));
    for c in value.chars() {
        let c = if c.is_ascii() && !c.is_ascii_control() { c } else { '?' };
        let width = if c == '\'' { 2 } else { 1 };
        if escaped.len() + width > MAX_STRING_VALUE {
            break;
        }
        if c == '\'' {
            escaped.push_str("''");
        } else {
            escaped.push(c);
        }
    }
    format!("'{escaped:<8}'")
}

fn pad(w: &mut impl Write, written: usize, fill: u8) -> Result<()> {
    let remainder = written % FITS_BLOCK_SIZE;
    if remainder != 0 {
        w.write_all(&vec![fill; FITS_BLOCK_SIZE - remainder])?;
    }
    Ok(())
}
