//! TLV (Type‑Length‑Value) encoding and decoding utilities.
//!
//! NDN packets use variable‑width numbers for both *type* and *length*;
//! CCNx 2015 packets use fixed 2‑byte types and lengths. Both flavours live
//! here so the codecs only deal with packet structure.

use crate::error::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/* ---------------------------------------------------------------- *
 * NDN TLV type constants
 * ---------------------------------------------------------------- */

pub const NDN_TLV_INTEREST: u64            = 0x05;
pub const NDN_TLV_DATA: u64                = 0x06;
pub const NDN_TLV_NAME: u64                = 0x07;
pub const NDN_TLV_NAME_COMPONENT: u64      = 0x08;
pub const NDN_TLV_SELECTORS: u64           = 0x09;
pub const NDN_TLV_NONCE: u64               = 0x0A;
pub const NDN_TLV_SCOPE: u64               = 0x0B;
pub const NDN_TLV_INTEREST_LIFETIME: u64   = 0x0C;
pub const NDN_TLV_MIN_SUFFIX: u64          = 0x0D;
pub const NDN_TLV_MAX_SUFFIX: u64          = 0x0E;
pub const NDN_TLV_PUBLISHER_LOCATOR: u64   = 0x0F;
pub const NDN_TLV_EXCLUDE: u64             = 0x10;
pub const NDN_TLV_MUST_BE_FRESH: u64       = 0x12;
pub const NDN_TLV_META_INFO: u64           = 0x14;
pub const NDN_TLV_CONTENT: u64             = 0x15;
pub const NDN_TLV_SIGNATURE_INFO: u64      = 0x16;
pub const NDN_TLV_SIGNATURE_VALUE: u64     = 0x17;
pub const NDN_TLV_CONTENT_TYPE: u64        = 0x18;
pub const NDN_TLV_FRESHNESS_PERIOD: u64    = 0x19;
pub const NDN_TLV_FINAL_BLOCK_ID: u64      = 0x1A;
pub const NDN_TLV_SIGNATURE_TYPE: u64      = 0x1B;
pub const NDN_TLV_LP_FRAGMENT: u64         = 0x50;
pub const NDN_TLV_LP_PACKET: u64           = 0x64;
pub const NDN_TLV_LP_NACK: u64             = 0x0320;
pub const NDN_TLV_LP_NACK_REASON: u64      = 0x0321;

/// Marker byte prefixed to a segment-number name component.
pub const NDN_MARKER_SEGMENT: u8 = 0x00;

/* ---------------------------------------------------------------- *
 * CCNx 2015 constants
 * ---------------------------------------------------------------- */

pub const CCNX_TLV_V1: u8                  = 1;
pub const CCNX_PT_INTEREST: u8             = 0;
pub const CCNX_PT_DATA: u8                 = 1;
pub const CCNX_PT_NACK: u8                 = 2;
pub const CCNX_PT_FRAGMENT: u8             = 3;

pub const CCNX_TLV_TL_INTEREST: u16        = 0x0001;
pub const CCNX_TLV_TL_OBJECT: u16          = 0x0002;
pub const CCNX_TLV_M_NAME: u16             = 0x0000;
pub const CCNX_TLV_M_PAYLOAD: u16          = 0x0001;
pub const CCNX_TLV_M_KEY_ID_RESTRICTION: u16 = 0x0002;
pub const CCNX_TLV_M_END_CHUNK: u16        = 0x0019;
pub const CCNX_TLV_N_NAME_SEGMENT: u16     = 0x0001;
pub const CCNX_TLV_N_CHUNK: u16            = 0x0010;
pub const CCNX_TLV_N_META: u16             = 0x0011;

/// Size of the CCNx 2015 fixed header.
pub const CCNX_FIXED_HEADER_LEN: usize = 8;

/// Size of a CCNx 2015 type/length pair.
pub const CCNX_TL_LEN: usize = 4;

/// InterestReturn code for "no route".
pub const CCNX_RETURN_NO_ROUTE: u8 = 1;

/* ---------------------------------------------------------------- *
 * Variable‑width numbers (NDN)
 * ---------------------------------------------------------------- */

/// Encode an NDN variable‑width number, used for TLV types and lengths.
///
/// * `< 253`  → 1 byte
/// * `≤ 65 535`  → marker 253 + 2‑byte value
/// * `≤ u32::MAX` → marker 254 + 4‑byte value
/// * otherwise → marker 255 + 8‑byte value
pub fn encode_var_number(value: u64, buf: &mut BytesMut) {
    if value < 253 {
        buf.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.put_u8(253);
        buf.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        buf.put_u8(254);
        buf.put_u32(value as u32);
    } else {
        buf.put_u8(255);
        buf.put_u64(value);
    }
}

/// Decode an NDN variable‑width number.
pub fn decode_var_number(buf: &mut impl Buf) -> Result<u64, Error> {
    if !buf.has_remaining() {
        return Err(Error::Parse("buffer underflow when decoding TLV number".into()));
    }

    let first_byte = buf.get_u8();
    match first_byte {
        0..=252 => Ok(first_byte as u64),
        253 => {
            if buf.remaining() < 2 {
                return Err(Error::Parse("buffer underflow when decoding 16‑bit TLV number".into()));
            }
            Ok(buf.get_u16() as u64)
        }
        254 => {
            if buf.remaining() < 4 {
                return Err(Error::Parse("buffer underflow when decoding 32‑bit TLV number".into()));
            }
            Ok(buf.get_u32() as u64)
        }
        255 => {
            if buf.remaining() < 8 {
                return Err(Error::Parse("buffer underflow when decoding 64‑bit TLV number".into()));
            }
            Ok(buf.get_u64())
        }
    }
}

/// Number of bytes required to encode `value` as a variable‑width number.
pub fn var_number_size(value: u64) -> usize {
    if value < 253 {
        1
    } else if value <= u16::MAX as u64 {
        3
    } else if value <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/* ---------------------------------------------------------------- *
 * Non‑negative integers
 * ---------------------------------------------------------------- */

/// Encode `value` with the fewest big‑endian bytes (1, 2, 4 or 8).
pub fn encode_non_neg_int(value: u64, buf: &mut BytesMut) {
    if value <= u8::MAX as u64 {
        buf.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        buf.put_u32(value as u32);
    } else {
        buf.put_u64(value);
    }
}

/// Decode a big‑endian unsigned integer of up to eight bytes.
pub fn decode_non_neg_int(bytes: &[u8]) -> Result<u64, Error> {
    if bytes.len() > 8 {
        return Err(Error::Parse(format!(
            "non-negative integer of {} bytes does not fit 64 bits",
            bytes.len()
        )));
    }
    Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

/// Minimal big‑endian bytes of `value`, without any length rounding.
pub fn minimal_be_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take(7).take_while(|&&b| b == 0).count();
    bytes[skip..].to_vec()
}

/* ---------------------------------------------------------------- *
 * TLV element wrapper
 * ---------------------------------------------------------------- */

/// A generic NDN TLV element consisting of *type*, *length* and *value*.
#[derive(Debug, Clone, PartialEq)]
pub struct TlvElement {
    pub tlv_type: u64,
    pub value: Bytes,
}

impl TlvElement {
    /// Create a new wrapper from raw parts.
    pub fn new(tlv_type: u64, value: impl Into<Bytes>) -> Self {
        Self {
            tlv_type,
            value: value.into(),
        }
    }

    /// Total number of bytes when this element is encoded.
    pub fn len(&self) -> usize {
        let vlen = self.value.len();
        var_number_size(self.tlv_type)
        + var_number_size(vlen as u64)
        + vlen
    }

    /// True when the value is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Encode this element into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        encode_var_number(self.tlv_type, buf);
        encode_var_number(self.value.len() as u64, buf);
        buf.extend_from_slice(&self.value);
    }

    /// Decode a single element from `buf` **in‑place**.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        if buf.remaining() < 2 {
            return Err(Error::Parse("buffer too small for TLV header".into()));
        }

        let tlv_type = decode_var_number(buf)?;
        let length   = decode_var_number(buf)? as usize;

        if buf.remaining() < length {
            return Err(Error::Parse(format!(
                "buffer underflow: TLV value requires {} bytes but only {} available",
                length,
                buf.remaining()
            )));
        }

        // bytes 1.*: cheap zero‑copy slice
        let value = buf.copy_to_bytes(length);
        Ok(Self { tlv_type, value })
    }

    /// Decode every element contained in `value` until it is exhausted.
    pub fn decode_all(mut value: Bytes) -> Result<Vec<Self>, Error> {
        let mut elements = Vec::new();
        while value.has_remaining() {
            elements.push(Self::decode(&mut value)?);
        }
        Ok(elements)
    }
}

/// Encode one NDN TLV straight into `buf`.
pub fn put_ndn_tlv(buf: &mut BytesMut, tlv_type: u64, value: &[u8]) {
    encode_var_number(tlv_type, buf);
    encode_var_number(value.len() as u64, buf);
    buf.extend_from_slice(value);
}

/* ---------------------------------------------------------------- *
 * CCNx 2015 fixed‑width TLVs
 * ---------------------------------------------------------------- */

/// Write a CCNx type/length pair.
pub fn put_ccnx_tl(buf: &mut BytesMut, tlv_type: u16, length: usize) -> Result<(), Error> {
    let length = u16::try_from(length).map_err(|_| {
        Error::CapacityExceeded(format!("CCNx TLV value of {} bytes exceeds 65535", length))
    })?;
    buf.put_u16(tlv_type);
    buf.put_u16(length);
    Ok(())
}

/// Read a CCNx type/length pair and check the value fits the buffer.
pub fn decode_ccnx_tl(buf: &mut impl Buf) -> Result<(u16, usize), Error> {
    if buf.remaining() < CCNX_TL_LEN {
        return Err(Error::Parse("buffer too small for CCNx TLV header".into()));
    }
    let tlv_type = buf.get_u16();
    let length = buf.get_u16() as usize;
    if buf.remaining() < length {
        return Err(Error::Parse(format!(
            "buffer underflow: CCNx TLV value requires {} bytes but only {} available",
            length,
            buf.remaining()
        )));
    }
    Ok((tlv_type, length))
}
