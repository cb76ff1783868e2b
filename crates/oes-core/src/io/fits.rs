use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::{PipelineError, Result};
use crate::frame::Image;

/// Keywords describing the data layout. The writer regenerates these, so they
/// are never carried over from a source header.
pub(crate) const STRUCTURAL_KEYWORDS: [&str; 9] = [
    "SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "EXTEND", "BZERO", "BSCALE", "BLANK",
];

/// A parsed header value.
#[derive(Clone, Debug, PartialEq)]
pub enum FitsValue {
    String(String),
    Integer(i64),
    Float(f64),
    Logical(bool),
    /// Value indicator present but no value.
    Undefined,
}

impl FitsValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// One 80-column header record.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderCard {
    pub keyword: String,
    /// `None` for commentary cards (COMMENT, HISTORY, blank).
    pub value: Option<FitsValue>,
    pub comment: Option<String>,
}

/// Primary header, cards in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<HeaderCard>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[HeaderCard] {
        &self.cards
    }

    pub fn get(&self, keyword: &str) -> Option<&FitsValue> {
        self.cards
            .iter()
            .find(|c| c.keyword == keyword)
            .and_then(|c| c.value.as_ref())
    }

    pub fn get_string(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(FitsValue::as_str)
    }

    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(FitsValue::as_i64)
    }

    pub fn get_float(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(FitsValue::as_f64)
    }

    /// Replace the first card with this keyword, or append a new one.
    pub fn set(&mut self, keyword: &str, value: FitsValue) {
        let keyword = keyword.to_ascii_uppercase();
        match self.cards.iter_mut().find(|c| c.keyword == keyword) {
            Some(card) => card.value = Some(value),
            None => self.cards.push(HeaderCard {
                keyword,
                value: Some(value),
                comment: None,
            }),
        }
    }

    pub fn set_string(&mut self, keyword: &str, value: &str) {
        self.set(keyword, FitsValue::String(value.to_string()));
    }

    pub fn push_history(&mut self, text: &str) {
        self.cards.push(HeaderCard {
            keyword: "HISTORY".into(),
            value: None,
            comment: Some(text.to_string()),
        });
    }

    /// Cards other than the data-layout keywords.
    pub fn descriptive_cards(&self) -> impl Iterator<Item = &HeaderCard> {
        self.cards.iter().filter(|c| {
            !STRUCTURAL_KEYWORDS.contains(&c.keyword.as_str())
                && !(c.keyword.starts_with("NAXIS") && c.value.is_some())
        })
    }
}

/// Memory-mapped FITS primary HDU reader.
pub struct FitsReader {
    path: PathBuf,
    mmap: Mmap,
    pub header: FitsHeader,
    data_offset: usize,
    bitpix: i64,
    width: usize,
    height: usize,
}

impl FitsReader {
    /// Open a FITS file and parse its primary header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        if len < FITS_BLOCK_SIZE {
            return Err(invalid(path, "file too small for a FITS header block"));
        }
        let mmap = unsafe { Mmap::map(&file)? };

        if !mmap.starts_with(b"SIMPLE  =") {
            return Err(invalid(path, "missing SIMPLE keyword"));
        }

        let (header, header_len) = parse_header(&mmap).map_err(|reason| invalid(path, &reason))?;

        let bitpix = header
            .get_int("BITPIX")
            .ok_or_else(|| invalid(path, "missing BITPIX"))?;
        if bytes_per_sample(bitpix).is_none() {
            return Err(invalid(path, &format!("unsupported BITPIX {bitpix}")));
        }
        let naxis = header.get_int("NAXIS").unwrap_or(0);
        if naxis != 2 {
            return Err(invalid(path, &format!("expected NAXIS = 2, got {naxis}")));
        }
        let width = header.get_int("NAXIS1").unwrap_or(0);
        let height = header.get_int("NAXIS2").unwrap_or(0);
        if width <= 0 || height <= 0 {
            return Err(invalid(path, &format!("invalid dimensions {width}x{height}")));
        }

        let reader = Self {
            path: path.to_path_buf(),
            mmap,
            header,
            data_offset: header_len,
            bitpix,
            width: width as usize,
            height: height as usize,
        };

        let expected = reader.data_offset + reader.data_byte_size();
        if reader.mmap.len() < expected {
            return Err(invalid(
                path,
                &format!(
                    "file truncated: expected at least {expected} bytes, got {}",
                    reader.mmap.len()
                ),
            ));
        }

        Ok(reader)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bitpix(&self) -> i64 {
        self.bitpix
    }

    pub fn data_byte_size(&self) -> usize {
        let bytes = bytes_per_sample(self.bitpix).unwrap_or(0);
        self.width * self.height * bytes
    }

    /// Decode the primary array to f32, applying BZERO/BSCALE.
    pub fn read_image(&self) -> Result<Image> {
        let raw = &self.mmap[self.data_offset..self.data_offset + self.data_byte_size()];
        let bzero = self.header.get_float("BZERO").unwrap_or(0.0);
        let bscale = self.header.get_float("BSCALE").unwrap_or(1.0);

        let mut cursor = Cursor::new(raw);
        let mut data = Array2::<f32>::zeros((self.height, self.width));
        for value in data.iter_mut() {
            let sample = match self.bitpix {
                8 => cursor.read_u8()? as f64,
                16 => cursor.read_i16::<BigEndian>()? as f64,
                32 => cursor.read_i32::<BigEndian>()? as f64,
                -32 => cursor.read_f32::<BigEndian>()? as f64,
                -64 => cursor.read_f64::<BigEndian>()?,
                other => {
                    return Err(invalid(&self.path, &format!("unsupported BITPIX {other}")));
                }
            };
            *value = (bzero + bscale * sample) as f32;
        }

        Ok(Image::new(data, self.header.clone()))
    }
}

/// Read only the primary header of a FITS file.
pub fn read_header(path: &Path) -> Result<FitsHeader> {
    Ok(FitsReader::open(path)?.header)
}

/// Read the primary image of a FITS file.
pub fn read_image(path: &Path) -> Result<Image> {
    FitsReader::open(path)?.read_image()
}

fn invalid(path: &Path, reason: &str) -> PipelineError {
    PipelineError::InvalidFits {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn bytes_per_sample(bitpix: i64) -> Option<usize> {
    match bitpix {
        8 => Some(1),
        16 => Some(2),
        32 | -32 => Some(4),
        -64 => Some(8),
        _ => None,
    }
}

/// Parse header cards up to END. Returns the header and its padded byte length.
fn parse_header(buf: &[u8]) -> std::result::Result<(FitsHeader, usize), String> {
    let mut header = FitsHeader::new();
    let mut offset = 0;

    loop {
        if offset + FITS_CARD_SIZE > buf.len() {
            return Err("header has no END card".into());
        }
        let card = &buf[offset..offset + FITS_CARD_SIZE];
        offset += FITS_CARD_SIZE;

        if !card.is_ascii() {
            return Err(format!("non-ASCII header card at byte {}", offset - FITS_CARD_SIZE));
        }
        let card = String::from_utf8_lossy(card);
        let keyword = card[..8].trim_end().to_string();
        if keyword == "END" {
            break;
        }
        header.cards.push(parse_card(keyword, &card));
    }

    let padded = offset.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE;
    Ok((header, padded))
}

fn parse_card(keyword: String, card: &str) -> HeaderCard {
    if &card[8..10] != "= " {
        let text = card[8..].trim_end();
        return HeaderCard {
            keyword,
            value: None,
            comment: (!text.is_empty()).then(|| text.trim_start().to_string()),
        };
    }

    let field = &card[10..];
    let trimmed = field.trim_start();

    if let Some(rest) = trimmed.strip_prefix('\'') {
        let (value, after) = parse_quoted(rest);
        let comment = after
            .split_once('/')
            .map(|(_, c)| c.trim().to_string())
            .filter(|c| !c.is_empty());
        return HeaderCard {
            keyword,
            value: Some(FitsValue::String(value)),
            comment,
        };
    }

    let (token, comment) = match trimmed.split_once('/') {
        Some((v, c)) => (v.trim(), Some(c.trim().to_string()).filter(|c| !c.is_empty())),
        None => (trimmed.trim(), None),
    };

    HeaderCard {
        keyword,
        value: Some(parse_token(token)),
        comment,
    }
}

/// Parse a quoted string body (opening quote already consumed). `''` is an
/// escaped quote. Trailing blanks inside the quotes are not significant.
fn parse_quoted(s: &str) -> (String, &str) {
    let mut value = String::new();
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                value.push('\'');
                chars.next();
            } else {
                return (value.trim_end().to_string(), &s[i + 1..]);
            }
        } else {
            value.push(c);
        }
    }
    (value.trim_end().to_string(), "")
}

fn parse_token(token: &str) -> FitsValue {
    match token {
        "" => FitsValue::Undefined,
        "T" => FitsValue::Logical(true),
        "F" => FitsValue::Logical(false),
        _ => {
            if let Ok(i) = token.parse::<i64>() {
                FitsValue::Integer(i)
            } else if let Ok(f) = token.replace(['D', 'd'], "E").parse::<f64>() {
                FitsValue::Float(f)
            } else {
                FitsValue::String(token.to_string())
            }
        }
    }
}
