//! CCNx 2015 packet format: 8-byte fixed header followed by 2-byte TLVs.
//!
//! ```text
//! +---------+---------+-----------------+
//! | version | ptype   | packet length   |
//! +---------+---------+--------+--------+
//! | hoplim  | retcode | flags  | hdrlen |
//! +---------+---------+--------+--------+
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::trace;
use std::time::Duration;

use super::Codec;
use crate::error::Error;
use crate::packet::{Details, Packet, PacketKind, CCNX_DEFAULT_HOP_LIMIT};
use crate::prefix::Prefix;
use crate::tlv::{self, CCNX_FIXED_HEADER_LEN, CCNX_TL_LEN};
use crate::types::{Suite, MAX_NAME_COMPONENTS, MAX_PACKET_SIZE};
use crate::Result;

/// Codec for the `ccnx2015` suite.
#[derive(Debug, Default, Clone)]
pub struct CcnTlvCodec;

impl CcnTlvCodec {
    pub fn new() -> Self {
        Self
    }
}

/// Splits a buffer into `(type, value)` pairs.
fn decode_elements(mut buf: Bytes) -> Result<Vec<(u16, Bytes)>> {
    let mut elements = Vec::new();
    while buf.has_remaining() {
        let (tlv_type, len) = tlv::decode_ccnx_tl(&mut buf)?;
        elements.push((tlv_type, buf.split_to(len)));
    }
    Ok(elements)
}

/// Decodes a Name value. Components keep their 4-byte TL header.
fn decode_name(mut value: Bytes) -> Result<Prefix> {
    let mut components = Vec::new();
    let mut chunknum = None;
    while value.has_remaining() {
        let start = value.clone();
        let (tlv_type, len) = tlv::decode_ccnx_tl(&mut value)?;
        if tlv_type == tlv::CCNX_TLV_N_CHUNK {
            chunknum = Some(tlv::decode_non_neg_int(&value[..len])? as u32);
        }
        if components.len() >= MAX_NAME_COMPONENTS {
            return Err(Error::Parse(format!(
                "name exceeds {} components",
                MAX_NAME_COMPONENTS
            )));
        }
        components.push(start.slice(..CCNX_TL_LEN + len));
        value.advance(len);
    }

    let mut prefix = Prefix::from_wire_components(Suite::CcnTlv, components)?;
    prefix.strip_nfn_marker();
    prefix.set_chunknum(chunknum);
    Ok(prefix)
}

fn encode_name(buf: &mut BytesMut, prefix: &Prefix) -> Result<()> {
    let components = prefix.wire_components()?;
    let len = components.iter().map(|c| c.len()).sum();
    tlv::put_ccnx_tl(buf, tlv::CCNX_TLV_M_NAME, len)?;
    for component in components {
        buf.extend_from_slice(&component);
    }
    Ok(())
}

/// Wraps a message in the fixed header.
fn frame(ptype: u8, hop_limit: u8, message_type: u16, message: &[u8]) -> Result<Bytes> {
    let total = CCNX_FIXED_HEADER_LEN + CCNX_TL_LEN + message.len();
    if total > MAX_PACKET_SIZE {
        return Err(Error::CapacityExceeded(format!(
            "encoded packet of {} bytes exceeds {}",
            total, MAX_PACKET_SIZE
        )));
    }

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u8(tlv::CCNX_TLV_V1);
    buf.put_u8(ptype);
    buf.put_u16(total as u16);
    buf.put_u8(hop_limit);
    buf.put_u8(0);
    buf.put_u8(0);
    buf.put_u8(CCNX_FIXED_HEADER_LEN as u8);
    tlv::put_ccnx_tl(&mut buf, message_type, message.len())?;
    buf.extend_from_slice(message);
    Ok(buf.freeze())
}

impl Codec for CcnTlvCodec {
    fn suite(&self) -> Suite {
        Suite::CcnTlv
    }

    fn decode(&self, frame: Bytes) -> Result<Packet> {
        if frame.len() < CCNX_FIXED_HEADER_LEN {
            return Err(Error::Parse(format!(
                "CCNx frame of {} bytes is shorter than its fixed header",
                frame.len()
            )));
        }
        let version = frame[0];
        let ptype = frame[1];
        let pktlen = u16::from_be_bytes([frame[2], frame[3]]) as usize;
        let hop_limit = frame[4];
        let hdrlen = frame[7] as usize;

        if version != tlv::CCNX_TLV_V1 {
            return Err(Error::Parse(format!("unsupported CCNx version {}", version)));
        }
        if pktlen != frame.len() || hdrlen < CCNX_FIXED_HEADER_LEN || hdrlen > pktlen {
            return Err(Error::Parse(format!(
                "inconsistent CCNx lengths: frame={} pktlen={} hdrlen={}",
                frame.len(),
                pktlen,
                hdrlen
            )));
        }

        let kind = match ptype {
            tlv::CCNX_PT_INTEREST => PacketKind::Interest,
            tlv::CCNX_PT_DATA => PacketKind::Content,
            tlv::CCNX_PT_NACK => PacketKind::Nack,
            other => {
                return Err(Error::Parse(format!("unsupported CCNx packet type {}", other)))
            }
        };

        let mut body = frame.slice(hdrlen..);
        let (message_type, len) = tlv::decode_ccnx_tl(&mut body)?;
        if body.len() != len {
            return Err(Error::Parse(format!(
                "{} trailing bytes after CCNx message",
                body.len() - len
            )));
        }
        let expected = match kind {
            PacketKind::Content => tlv::CCNX_TLV_TL_OBJECT,
            _ => tlv::CCNX_TLV_TL_INTEREST,
        };
        if message_type != expected {
            return Err(Error::Parse(format!(
                "CCNx {} carries message type {}",
                kind, message_type
            )));
        }

        let mut prefix = None;
        let mut content = None;
        let mut key_id = None;
        let mut end_chunk = None;
        for (tlv_type, value) in decode_elements(body)? {
            match tlv_type {
                tlv::CCNX_TLV_M_NAME => prefix = Some(decode_name(value)?),
                tlv::CCNX_TLV_M_PAYLOAD => content = Some(value),
                tlv::CCNX_TLV_M_KEY_ID_RESTRICTION => key_id = Some(value),
                tlv::CCNX_TLV_M_END_CHUNK => end_chunk = Some(tlv::decode_non_neg_int(&value)?),
                other => trace!("  skipping CCNx message field 0x{:04x}", other),
            }
        }

        let prefix = prefix.ok_or_else(|| Error::Parse("CCNx packet without name".into()))?;
        trace!("decoded ccnx2015 {} <{}>", kind, prefix);

        let details = Details::CcnTlv {
            key_id,
            hop_limit,
            end_chunk,
        };
        let mut packet = Packet::new(frame, prefix, kind, details);
        if kind == PacketKind::Content {
            packet.content = Some(content.unwrap_or_default());
        }
        Ok(packet)
    }

    fn encode_interest(
        &self,
        prefix: &Prefix,
        _nonce: Option<u32>,
        _lifetime: Option<Duration>,
    ) -> Result<Bytes> {
        let mut message = BytesMut::new();
        encode_name(&mut message, prefix)?;
        frame(
            tlv::CCNX_PT_INTEREST,
            CCNX_DEFAULT_HOP_LIMIT,
            tlv::CCNX_TLV_TL_INTEREST,
            &message,
        )
    }

    fn encode_content(
        &self,
        prefix: &Prefix,
        payload: &[u8],
        _freshness: Option<Duration>,
    ) -> Result<Bytes> {
        let mut message = BytesMut::new();
        encode_name(&mut message, prefix)?;
        tlv::put_ccnx_tl(&mut message, tlv::CCNX_TLV_M_PAYLOAD, payload.len())?;
        message.extend_from_slice(payload);
        frame(tlv::CCNX_PT_DATA, 0, tlv::CCNX_TLV_TL_OBJECT, &message)
    }

    /// An InterestReturn: the Interest itself with packet type Nack and
    /// return code "no route".
    fn encode_nack(&self, interest: &Packet) -> Result<Option<Bytes>> {
        if interest.buf.len() < CCNX_FIXED_HEADER_LEN {
            return Ok(None);
        }
        let mut buf = BytesMut::from(&interest.buf[..]);
        buf[1] = tlv::CCNX_PT_NACK;
        buf[5] = tlv::CCNX_RETURN_NO_ROUTE;
        Ok(Some(buf.freeze()))
    }
}
