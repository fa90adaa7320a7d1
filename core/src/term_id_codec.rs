//! Maps a (value index, origin structure) pair onto one global term id.
//!
//! The id space is partitioned: `[0, max_main_tvi)` belongs to the main
//! index and `[max_main_tvi, max_main_tvi + max_lite_tvi)` to the lite
//! index, so ids from the two origins can never collide.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TviType {
    Lite,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermIdCodec {
    max_main_tvi: u32,
    max_lite_tvi: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedTermInfo {
    pub tvi: u32,
    pub tvi_type: TviType,
}

impl TermIdCodec {
    pub fn create(max_main_tvi: u32, max_lite_tvi: u32) -> Result<Self> {
        if max_main_tvi.checked_add(max_lite_tvi).is_none() {
            return Err(Error::InvalidArgument(format!(
                "sum of main ({max_main_tvi}) and lite ({max_lite_tvi}) value index bounds overflows u32"
            )));
        }
        Ok(TermIdCodec {
            max_main_tvi,
            max_lite_tvi,
        })
    }

    pub fn encode_tvi(&self, tvi: u32, tvi_type: TviType) -> Result<u32> {
        match tvi_type {
            TviType::Main => {
                if tvi >= self.max_main_tvi {
                    return Err(Error::InvalidArgument(format!(
                        "main tvi {tvi} is not below the bound {}",
                        self.max_main_tvi
                    )));
                }
                Ok(tvi)
            }
            TviType::Lite => {
                if tvi >= self.max_lite_tvi {
                    return Err(Error::InvalidArgument(format!(
                        "lite tvi {tvi} is not below the bound {}",
                        self.max_lite_tvi
                    )));
                }
                Ok(tvi + self.max_main_tvi)
            }
        }
    }

    pub fn decode_term_info(&self, term_id: u32) -> Result<DecodedTermInfo> {
        if term_id >= self.max_term_id() {
            return Err(Error::InvalidArgument(format!(
                "term id {term_id} is outside the codec range (max {})",
                self.max_term_id()
            )));
        }
        if term_id >= self.max_main_tvi {
            Ok(DecodedTermInfo {
                tvi: term_id - self.max_main_tvi,
                tvi_type: TviType::Lite,
            })
        } else {
            Ok(DecodedTermInfo {
                tvi: term_id,
                tvi_type: TviType::Main,
            })
        }
    }

    pub fn max_main_tvi(&self) -> u32 {
        self.max_main_tvi
    }

    pub fn max_lite_tvi(&self) -> u32 {
        self.max_lite_tvi
    }

    pub fn max_term_id(&self) -> u32 {
        self.max_main_tvi + self.max_lite_tvi
    }
}
