//! FITS header keyword extraction.
//!
//! A FITS file is a sequence of HDUs. Each HDU starts with a header made of
//! 80-byte ASCII "cards" packed into 2880-byte blocks and terminated by an
//! `END` card, followed by an optional data segment padded to a 2880-byte
//! boundary. We only care about the keyword field (bytes 0..8 of each card);
//! the data segments are skipped using the sizes declared in the header.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;
const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Per-file extraction failures. These never abort a run; the driver maps
/// them to an empty signature and records the file as rejected.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("not a FITS file: first card keyword is {0:?}")]
    NotFits(String),

    #[error("extension HDU does not start with XTENSION (found {0:?})")]
    BadExtension(String),

    #[error("header card contains non-ascii bytes")]
    NonAsciiCard,

    #[error("unexpected end of file inside a header")]
    TruncatedHeader,

    #[error("bad integer value for {key}: {value:?}")]
    BadValue { key: String, value: String },

    #[error("declared data segment size overflows")]
    OversizedData,
}

/// Read every header keyword of every HDU in `path`, in file order and with
/// duplicates intact. Blank cards contribute an empty keyword; filtering is
/// the normalizer's job.
pub fn extract_keywords(path: &Path) -> Result<Vec<String>, ExtractError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut keywords = Vec::new();
    let mut hdu_index = 0usize;

    loop {
        let header = match read_header(&mut reader, hdu_index) {
            Ok(Some(header)) => header,
            Ok(None) => break, // clean EOF between HDUs
            Err(e) => return Err(e),
        };

        let data_len = data_segment_len(&header)?;
        keywords.extend(header.cards.into_iter().map(|card| card.keyword));

        if data_len > 0 {
            let offset = i64::try_from(data_len).map_err(|_| ExtractError::OversizedData)?;
            reader.seek(SeekFrom::Current(offset))?;
        }
        hdu_index += 1;
    }

    if hdu_index == 0 {
        // zero-length file
        return Err(ExtractError::TruncatedHeader);
    }
    Ok(keywords)
}

struct Card {
    keyword: String,
    value: Option<String>,
}

struct Header {
    cards: Vec<Card>,
}

impl Header {
    /// Integer value of a mandatory-format card, or `None` when absent.
    fn int_value(&self, key: &str) -> Result<Option<i64>, ExtractError> {
        for card in &self.cards {
            if card.keyword == key {
                let raw = card.value.as_deref().unwrap_or("");
                let parsed = raw.parse::<i64>().map_err(|_| ExtractError::BadValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                })?;
                return Ok(Some(parsed));
            }
        }
        Ok(None)
    }

    fn required_int(&self, key: &str) -> Result<i64, ExtractError> {
        self.int_value(key)?.ok_or_else(|| ExtractError::BadValue {
            key: key.to_string(),
            value: "<missing>".to_string(),
        })
    }
}

/// Read one full header (through its `END` card). Returns `Ok(None)` on a
/// clean EOF at an HDU boundary.
fn read_header(
    reader: &mut BufReader<File>,
    hdu_index: usize,
) -> Result<Option<Header>, ExtractError> {
    let mut cards = Vec::new();
    let mut block = [0u8; BLOCK_SIZE];
    let mut first_block = true;

    loop {
        if !read_block(reader, &mut block)? {
            if first_block {
                return Ok(None);
            }
            // EOF in the middle of a header
            return Err(ExtractError::TruncatedHeader);
        }

        for i in 0..CARDS_PER_BLOCK {
            let card_bytes = &block[i * CARD_SIZE..(i + 1) * CARD_SIZE];
            if !card_bytes.is_ascii() {
                return Err(ExtractError::NonAsciiCard);
            }
            let card = parse_card(card_bytes);

            if first_block && i == 0 {
                // The first card pins down the HDU kind
                if hdu_index == 0 && card.keyword != "SIMPLE" {
                    return Err(ExtractError::NotFits(card.keyword));
                }
                if hdu_index > 0 && card.keyword != "XTENSION" {
                    return Err(ExtractError::BadExtension(card.keyword));
                }
            }

            if card.keyword == "END" {
                return Ok(Some(Header { cards }));
            }
            cards.push(card);
        }
        first_block = false;
    }
}

fn parse_card(bytes: &[u8]) -> Card {
    let keyword = String::from_utf8_lossy(&bytes[..8]).trim_end().to_string();

    // Value indicator is "= " at bytes 8..10; everything up to an optional
    // '/' comment is the value field. Only fixed-format integers are ever
    // consumed, so no quote handling is needed here.
    let value = if bytes.len() >= 10 && bytes[8] == b'=' && bytes[9] == b' ' {
        let field = String::from_utf8_lossy(&bytes[10..]);
        let field = match field.find('/') {
            Some(pos) => &field[..pos],
            None => &field[..],
        };
        Some(field.trim().to_string())
    } else {
        None
    };

    Card { keyword, value }
}

/// Byte length of the data segment following `header`, rounded up to a full
/// block: |BITPIX|/8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn), zero when
/// NAXIS = 0. PCOUNT/GCOUNT default to 0/1 for primary HDUs.
///
/// Every factor here comes straight from the file, so all the arithmetic is
/// checked; a header declaring an absurd geometry is a per-file failure,
/// not a crash.
fn data_segment_len(header: &Header) -> Result<u64, ExtractError> {
    let bitpix = header.required_int("BITPIX")?;
    let naxis = header.required_int("NAXIS")?;
    if naxis == 0 {
        return Ok(0);
    }
    if !(1..=999).contains(&naxis) {
        return Err(bad_value("NAXIS", naxis));
    }

    let mut axis_product: u64 = 1;
    for i in 1..=naxis {
        let key = format!("NAXIS{}", i);
        let axis = header.required_int(&key)?;
        if axis < 0 {
            return Err(bad_value(&key, axis));
        }
        axis_product = axis_product
            .checked_mul(axis as u64)
            .ok_or(ExtractError::OversizedData)?;
    }

    let pcount = header.int_value("PCOUNT")?.unwrap_or(0);
    let gcount = header.int_value("GCOUNT")?.unwrap_or(1);
    if pcount < 0 {
        return Err(bad_value("PCOUNT", pcount));
    }
    if gcount < 0 {
        return Err(bad_value("GCOUNT", gcount));
    }

    let data_bytes = (bitpix.unsigned_abs() / 8)
        .checked_mul(gcount as u64)
        .and_then(|v| v.checked_mul(axis_product.checked_add(pcount as u64)?))
        .ok_or(ExtractError::OversizedData)?;
    let blocks = data_bytes.div_ceil(BLOCK_SIZE as u64);
    blocks
        .checked_mul(BLOCK_SIZE as u64)
        .ok_or(ExtractError::OversizedData)
}

fn bad_value(key: &str, value: i64) -> ExtractError {
    ExtractError::BadValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Read exactly one 2880-byte block. Returns `Ok(false)` on clean EOF before
/// any bytes, an error on a partial block.
fn read_block(reader: &mut BufReader<File>, block: &mut [u8; BLOCK_SIZE]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < BLOCK_SIZE {
        let n = reader.read(&mut block[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "partial FITS block",
            ));
        }
        filled += n;
    }
    Ok(true)
}
