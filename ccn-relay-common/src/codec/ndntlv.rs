//! NDN packet format (variable-width TLVs).

use bytes::{Bytes, BytesMut};
use log::{debug, trace};
use sha2::{Digest, Sha256};
use std::time::Duration;

use super::Codec;
use crate::error::Error;
use crate::packet::{Details, Packet, PacketKind};
use crate::prefix::Prefix;
use crate::tlv::{self, TlvElement};
use crate::types::{Suite, MAX_NAME_COMPONENTS, MAX_PACKET_SIZE};
use crate::Result;

/// NackReason sent when no route exists.
pub const NACK_REASON_NO_ROUTE: u64 = 150;

/// SignatureType of a DigestSha256 signature.
pub const SIGNATURE_DIGEST_SHA256: u64 = 0;

/// Codec for the `ndn2013` suite.
#[derive(Debug, Default, Clone)]
pub struct NdnTlvCodec;

impl NdnTlvCodec {
    pub fn new() -> Self {
        Self
    }

    fn decode_lp(&self, value: Bytes) -> Result<Packet> {
        let mut nack = false;
        let mut fragment = None;
        for element in TlvElement::decode_all(value)? {
            match element.tlv_type {
                tlv::NDN_TLV_LP_NACK => nack = true,
                tlv::NDN_TLV_LP_FRAGMENT => fragment = Some(element.value),
                other => trace!("  skipping LP field 0x{:x}", other),
            }
        }
        let fragment =
            fragment.ok_or_else(|| Error::Parse("LpPacket without fragment".into()))?;
        let mut packet = self.decode(fragment)?;
        if nack {
            packet.kind = PacketKind::Nack;
        }
        Ok(packet)
    }
}

/// Decodes the value of a Name TLV.
///
/// Components of unknown type are skipped. A trailing segment component
/// (marker `0x00` followed by at most four bytes) sets the chunk number.
fn decode_name(value: Bytes) -> Result<Prefix> {
    let mut components = Vec::new();
    for element in TlvElement::decode_all(value)? {
        if element.tlv_type != tlv::NDN_TLV_NAME_COMPONENT {
            continue;
        }
        if components.len() >= MAX_NAME_COMPONENTS {
            return Err(Error::Parse(format!(
                "name exceeds {} components",
                MAX_NAME_COMPONENTS
            )));
        }
        components.push(element.value);
    }

    let mut prefix = Prefix::from_wire_components(Suite::NdnTlv, components)?;
    prefix.strip_nfn_marker();
    if let Some(last) = prefix.len().checked_sub(1).and_then(|i| prefix.component(i)) {
        if last.len() > 1 && last.len() <= 5 && last[0] == tlv::NDN_MARKER_SEGMENT {
            let chunk = tlv::decode_non_neg_int(&last[1..])? as u32;
            prefix.set_chunknum(Some(chunk));
        }
    }
    Ok(prefix)
}

fn non_neg_int(element: &TlvElement) -> Result<u64> {
    tlv::decode_non_neg_int(&element.value)
}

fn encode_name(buf: &mut BytesMut, prefix: &Prefix) -> Result<()> {
    let mut name = BytesMut::new();
    for component in prefix.wire_components()? {
        tlv::put_ndn_tlv(&mut name, tlv::NDN_TLV_NAME_COMPONENT, &component);
    }
    tlv::put_ndn_tlv(buf, tlv::NDN_TLV_NAME, &name);
    Ok(())
}

fn put_non_neg_int(buf: &mut BytesMut, tlv_type: u64, value: u64) {
    let mut encoded = BytesMut::with_capacity(8);
    tlv::encode_non_neg_int(value, &mut encoded);
    tlv::put_ndn_tlv(buf, tlv_type, &encoded);
}

fn check_size(frame: &BytesMut) -> Result<()> {
    if frame.len() > MAX_PACKET_SIZE {
        return Err(Error::CapacityExceeded(format!(
            "encoded packet of {} bytes exceeds {}",
            frame.len(),
            MAX_PACKET_SIZE
        )));
    }
    Ok(())
}

impl Codec for NdnTlvCodec {
    fn suite(&self) -> Suite {
        Suite::NdnTlv
    }

    fn decode(&self, frame: Bytes) -> Result<Packet> {
        let mut cursor = frame.clone();
        let outer = TlvElement::decode(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(Error::Parse(format!(
                "{} trailing bytes after NDN packet",
                cursor.len()
            )));
        }

        let kind = match outer.tlv_type {
            tlv::NDN_TLV_INTEREST => PacketKind::Interest,
            tlv::NDN_TLV_DATA => PacketKind::Content,
            tlv::NDN_TLV_LP_PACKET => return self.decode_lp(outer.value),
            other => {
                return Err(Error::Parse(format!("unknown NDN packet type 0x{:x}", other)))
            }
        };

        let mut prefix = None;
        let mut content = None;
        let mut min_suffix = 0u32;
        let mut max_suffix = MAX_NAME_COMPONENTS as u32;
        let mut scope = crate::packet::NDN_DEFAULT_SCOPE;
        let mut must_be_fresh = false;
        let mut nonce = None;
        let mut ppkl = None;
        let mut interest_lifetime_ms = crate::packet::NDN_DEFAULT_LIFETIME_MS;
        let mut freshness_period_ms = None;
        let mut final_block_id = None;

        for element in TlvElement::decode_all(outer.value)? {
            match element.tlv_type {
                tlv::NDN_TLV_NAME => prefix = Some(decode_name(element.value)?),
                tlv::NDN_TLV_SELECTORS => {
                    for selector in TlvElement::decode_all(element.value)? {
                        match selector.tlv_type {
                            tlv::NDN_TLV_MIN_SUFFIX => min_suffix = non_neg_int(&selector)? as u32,
                            tlv::NDN_TLV_MAX_SUFFIX => max_suffix = non_neg_int(&selector)? as u32,
                            tlv::NDN_TLV_PUBLISHER_LOCATOR => ppkl = Some(selector.value),
                            tlv::NDN_TLV_MUST_BE_FRESH => must_be_fresh = true,
                            tlv::NDN_TLV_EXCLUDE => debug!("  'exclude' selector ignored"),
                            _ => {}
                        }
                    }
                }
                tlv::NDN_TLV_NONCE => {
                    if nonce.is_none() {
                        nonce = Some(element.value);
                    }
                }
                tlv::NDN_TLV_SCOPE => scope = non_neg_int(&element)?.min(u8::MAX as u64) as u8,
                tlv::NDN_TLV_INTEREST_LIFETIME => interest_lifetime_ms = non_neg_int(&element)?,
                tlv::NDN_TLV_META_INFO => {
                    for meta in TlvElement::decode_all(element.value)? {
                        match meta.tlv_type {
                            tlv::NDN_TLV_FRESHNESS_PERIOD => {
                                freshness_period_ms = Some(non_neg_int(&meta)?)
                            }
                            tlv::NDN_TLV_FINAL_BLOCK_ID => {
                                let mut inner = meta.value.clone();
                                let component = TlvElement::decode(&mut inner)?;
                                final_block_id = Some(component.value);
                            }
                            _ => {}
                        }
                    }
                }
                tlv::NDN_TLV_CONTENT => content = Some(element.value),
                _ => {}
            }
        }

        let prefix = prefix.ok_or_else(|| Error::Parse("NDN packet without name".into()))?;
        trace!("decoded ndn2013 {} <{}>", kind, prefix);

        let details = Details::NdnTlv {
            min_suffix,
            max_suffix,
            scope,
            must_be_fresh,
            nonce,
            ppkl,
            interest_lifetime_ms,
            freshness_period_ms,
            final_block_id,
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
        nonce: Option<u32>,
        lifetime: Option<Duration>,
    ) -> Result<Bytes> {
        let mut body = BytesMut::new();
        encode_name(&mut body, prefix)?;
        if let Some(nonce) = nonce {
            tlv::put_ndn_tlv(&mut body, tlv::NDN_TLV_NONCE, &nonce.to_be_bytes());
        }
        if let Some(lifetime) = lifetime {
            put_non_neg_int(&mut body, tlv::NDN_TLV_INTEREST_LIFETIME, lifetime.as_millis() as u64);
        }

        let mut frame = BytesMut::with_capacity(body.len() + 4);
        tlv::put_ndn_tlv(&mut frame, tlv::NDN_TLV_INTEREST, &body);
        check_size(&frame)?;
        Ok(frame.freeze())
    }

    fn encode_content(
        &self,
        prefix: &Prefix,
        payload: &[u8],
        freshness: Option<Duration>,
    ) -> Result<Bytes> {
        let mut signed = BytesMut::new();
        encode_name(&mut signed, prefix)?;
        if let Some(freshness) = freshness {
            let mut meta = BytesMut::new();
            put_non_neg_int(&mut meta, tlv::NDN_TLV_FRESHNESS_PERIOD, freshness.as_millis() as u64);
            tlv::put_ndn_tlv(&mut signed, tlv::NDN_TLV_META_INFO, &meta);
        }
        tlv::put_ndn_tlv(&mut signed, tlv::NDN_TLV_CONTENT, payload);

        let mut sig_info = BytesMut::new();
        put_non_neg_int(&mut sig_info, tlv::NDN_TLV_SIGNATURE_TYPE, SIGNATURE_DIGEST_SHA256);
        tlv::put_ndn_tlv(&mut signed, tlv::NDN_TLV_SIGNATURE_INFO, &sig_info);

        let digest = Sha256::digest(&signed);
        let mut body = signed;
        tlv::put_ndn_tlv(&mut body, tlv::NDN_TLV_SIGNATURE_VALUE, &digest);

        let mut frame = BytesMut::with_capacity(body.len() + 4);
        tlv::put_ndn_tlv(&mut frame, tlv::NDN_TLV_DATA, &body);
        check_size(&frame)?;
        Ok(frame.freeze())
    }

    fn encode_nack(&self, interest: &Packet) -> Result<Option<Bytes>> {
        let mut reason = BytesMut::new();
        put_non_neg_int(&mut reason, tlv::NDN_TLV_LP_NACK_REASON, NACK_REASON_NO_ROUTE);

        let mut body = BytesMut::new();
        tlv::put_ndn_tlv(&mut body, tlv::NDN_TLV_LP_NACK, &reason);
        tlv::put_ndn_tlv(&mut body, tlv::NDN_TLV_LP_FRAGMENT, &interest.buf);

        let mut frame = BytesMut::with_capacity(body.len() + 4);
        tlv::put_ndn_tlv(&mut frame, tlv::NDN_TLV_LP_PACKET, &body);
        Ok(Some(frame.freeze()))
    }
}
