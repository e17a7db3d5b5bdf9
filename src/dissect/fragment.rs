//! IPv4 fragment reassembly
//!
//! Fragments are grouped by source, destination and identification. A group completes once
//! offset 0 is present and the payload lengths lead, without gaps, to a fragment with the
//! more-fragments flag clear. The first fragment seen at an offset is the one kept.
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    net::Ipv4Addr,
};

use crate::dissect::ipv4::{IpProtocol, Ipv4Packet};

/// Default limit on incomplete datagrams tracked at once
pub const DEFAULT_MAX_PENDING_SETS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub identification: u16,
}
impl FragmentKey {
    pub fn of(packet: &Ipv4Packet<'_>) -> Self {
        Self {
            source: packet.source(),
            destination: packet.destination(),
            identification: packet.identification(),
        }
    }
}

/// An owned copy of one fragment's payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub protocol: IpProtocol,
    /// Byte offset into the original datagram
    pub offset: u16,
    pub more_fragments: bool,
    pub payload: Vec<u8>,
}
impl Fragment {
    pub fn new(protocol: IpProtocol, offset: u16, more_fragments: bool, payload: Vec<u8>) -> Self {
        Self {
            protocol,
            offset,
            more_fragments,
            payload,
        }
    }
    /// Copies the payload up to the packet's total length
    pub fn of(packet: &Ipv4Packet<'_>) -> Self {
        Self::new(
            packet.protocol(),
            packet.fragment_offset(),
            packet.flags().more_fragments,
            packet.declared_payload().to_vec(),
        )
    }
}

/// A datagram put back together from its fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassembledDatagram {
    pub key: FragmentKey,
    pub protocol: IpProtocol,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct FragmentSet {
    protocol: IpProtocol,
    fragments: BTreeMap<u16, Fragment>,
}
impl FragmentSet {
    /// Walks the fragments from offset 0, `None` while a piece is missing
    fn assemble(&self) -> Option<Vec<u8>> {
        let mut payload = Vec::new();
        let mut next = 0u32;
        loop {
            let fragment = self.fragments.get(&u16::try_from(next).ok()?)?;
            payload.extend_from_slice(&fragment.payload);
            if !fragment.more_fragments {
                return Some(payload);
            }
            if fragment.payload.is_empty() {
                // Would revisit the same offset forever
                return None;
            }
            next += fragment.payload.len() as u32;
        }
    }
}

/// Tracks incomplete datagrams and hands out the completed ones
///
/// When `max_pending_sets` datagrams are incomplete, a fragment of a new datagram evicts the
/// one that was started first.
#[derive(Debug)]
pub struct Ipv4Reassembler {
    pending: HashMap<FragmentKey, FragmentSet>,
    /// Pending keys, oldest first
    arrival: VecDeque<FragmentKey>,
    completed: HashMap<FragmentKey, ReassembledDatagram>,
    max_pending_sets: usize,
}
impl Default for Ipv4Reassembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING_SETS)
    }
}

impl Ipv4Reassembler {
    /// A limit of 0 is treated as 1
    pub fn new(max_pending_sets: usize) -> Self {
        Self {
            pending: HashMap::new(),
            arrival: VecDeque::new(),
            completed: HashMap::new(),
            max_pending_sets: max_pending_sets.max(1),
        }
    }
    /// Stores `packet` if it is a fragment, returning its key
    pub fn on_fragment(&mut self, packet: &Ipv4Packet<'_>) -> Option<FragmentKey> {
        if !packet.is_fragment() {
            return None;
        }
        let key = FragmentKey::of(packet);
        self.insert(key, Fragment::of(packet));
        Some(key)
    }
    /// Adds a fragment, ignoring it if its offset was already seen for this key
    pub fn insert(&mut self, key: FragmentKey, fragment: Fragment) {
        if !self.pending.contains_key(&key) {
            while self.pending.len() >= self.max_pending_sets {
                let Some(oldest) = self.arrival.pop_front() else {
                    break;
                };
                if self.pending.remove(&oldest).is_some() {
                    log::debug!(
                        "Dropping incomplete datagram {} from {} to {}",
                        oldest.identification,
                        oldest.source,
                        oldest.destination
                    );
                }
            }
            self.arrival.push_back(key);
        }
        let set = self.pending.entry(key).or_insert_with(|| FragmentSet {
            protocol: fragment.protocol,
            fragments: BTreeMap::new(),
        });
        if set.fragments.contains_key(&fragment.offset) {
            log::trace!(
                "Duplicate fragment at offset {} for datagram {}",
                fragment.offset,
                key.identification
            );
            return;
        }
        set.fragments.insert(fragment.offset, fragment);
    }
    /// Attempts to complete one datagram, returning whether it completed
    pub fn try_reassemble_key(&mut self, key: &FragmentKey) -> bool {
        let Some(payload) = self.pending.get(key).and_then(FragmentSet::assemble) else {
            return false;
        };
        let Some(set) = self.pending.remove(key) else {
            return false;
        };
        self.arrival.retain(|pending| pending != key);
        self.completed.insert(
            *key,
            ReassembledDatagram {
                key: *key,
                protocol: set.protocol,
                payload,
            },
        );
        true
    }
    /// Attempts to complete every pending datagram, returning the keys that completed
    pub fn try_reassemble(&mut self) -> Vec<FragmentKey> {
        let candidates: Vec<FragmentKey> = self
            .pending
            .iter()
            .filter(|(_, set)| set.fragments.contains_key(&0))
            .map(|(key, _)| *key)
            .collect();
        candidates
            .into_iter()
            .filter(|key| self.try_reassemble_key(key))
            .collect()
    }
    /// Removes and returns a completed datagram
    pub fn take_payload(&mut self, key: &FragmentKey) -> Option<ReassembledDatagram> {
        self.completed.remove(key)
    }
    pub fn is_pending(&self, key: &FragmentKey) -> bool {
        self.pending.contains_key(key)
    }
    pub fn pending_sets(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dissect::ethernet::EthernetFrame, test_helpers::ipv4_fragment};

    fn key(identification: u16) -> FragmentKey {
        FragmentKey {
            source: Ipv4Addr::new(10, 0, 0, 1),
            destination: Ipv4Addr::new(10, 0, 0, 2),
            identification,
        }
    }
    fn piece(offset: u16, more_fragments: bool, fill: u8) -> Fragment {
        Fragment::new(IpProtocol::Udp, offset, more_fragments, vec![fill; 185])
    }

    #[test]
    fn three_fragments_in_any_order() {
        let mut reassembler = Ipv4Reassembler::default();
        let key = key(0x1234);
        reassembler.insert(key, piece(370, false, 3));
        reassembler.insert(key, piece(0, true, 1));
        assert!(reassembler.try_reassemble().is_empty());
        reassembler.insert(key, piece(185, true, 2));

        assert_eq!(reassembler.try_reassemble(), vec![key]);
        assert!(!reassembler.is_pending(&key));
        let datagram = reassembler.take_payload(&key);
        let Some(datagram) = datagram else {
            panic!("datagram was not stored");
        };
        assert_eq!(datagram.protocol, IpProtocol::Udp);
        assert_eq!(datagram.payload.len(), 555);
        assert!(datagram.payload[..185].iter().all(|byte| *byte == 1));
        assert!(datagram.payload[185..370].iter().all(|byte| *byte == 2));
        assert!(datagram.payload[370..].iter().all(|byte| *byte == 3));
        assert!(reassembler.take_payload(&key).is_none());
    }

    #[test]
    fn first_seen_wins() {
        let mut reassembler = Ipv4Reassembler::default();
        let key = key(1);
        reassembler.insert(key, piece(0, true, 1));
        reassembler.insert(key, piece(0, true, 9));
        reassembler.insert(key, piece(185, false, 2));
        assert!(reassembler.try_reassemble_key(&key));
        let payload = reassembler.take_payload(&key).map(|d| d.payload);
        assert_eq!(payload.as_ref().map(|p| p[0]), Some(1));
    }

    #[test]
    fn gap_leaves_state_untouched() {
        let mut reassembler = Ipv4Reassembler::default();
        let key = key(2);
        reassembler.insert(key, piece(0, true, 1));
        reassembler.insert(key, piece(370, false, 3));
        assert!(!reassembler.try_reassemble_key(&key));
        assert!(reassembler.is_pending(&key));
        assert_eq!(reassembler.pending_sets(), 1);
    }

    #[test]
    fn oldest_incomplete_set_is_evicted() {
        let mut reassembler = Ipv4Reassembler::new(2);
        reassembler.insert(key(1), piece(0, true, 1));
        reassembler.insert(key(2), piece(0, true, 1));
        reassembler.insert(key(1), piece(185, true, 1));
        reassembler.insert(key(3), piece(0, true, 1));
        assert!(!reassembler.is_pending(&key(1)));
        assert!(reassembler.is_pending(&key(2)));
        assert!(reassembler.is_pending(&key(3)));
    }

    #[test]
    fn fragments_from_packets() -> anyhow::Result<()> {
        let mut reassembler = Ipv4Reassembler::default();
        let whole = ipv4_fragment(9, 0, false, &[0; 16]);
        let frame = EthernetFrame::parse(&whole)?;
        assert_eq!(
            reassembler.on_fragment(&Ipv4Packet::from_frame(&frame)?),
            None
        );

        let first = ipv4_fragment(9, 0, true, &[1; 16]);
        let last = ipv4_fragment(9, 2, false, &[2; 4]);
        let mut completed = None;
        for bytes in [&last, &first] {
            let frame = EthernetFrame::parse(bytes)?;
            let packet = Ipv4Packet::from_frame(&frame)?;
            if let Some(key) = reassembler.on_fragment(&packet)
                && reassembler.try_reassemble_key(&key)
            {
                completed = reassembler.take_payload(&key);
            }
        }
        let completed = completed.ok_or_else(|| anyhow::anyhow!("not reassembled"))?;
        assert_eq!(completed.key.identification, 9);
        assert_eq!(completed.payload.len(), 20);
        assert_eq!(&completed.payload[16..], &[2; 4]);
        Ok(())
    }
}
