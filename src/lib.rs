//! Reads PCAP and PCAP-NG captures and dissects the frames inside them
//!
//! - [pcap] and [pcap_ng] read and write the two container formats.
//! - [any_reader] picks the right reader by looking at the first bytes of a stream.
//! - [dissect] turns a captured Ethernet frame into borrowed IPv4, UDP and ICMP views.
//! - [pipeline] reads a PCAP-NG stream on one thread while dissecting on another.
pub mod any_reader;
pub mod byte_order;
pub mod captured_packet;
pub mod dissect;
pub mod error;
pub mod link_type;
pub mod pcap;
pub mod pcap_ng;
pub mod pipeline;
pub mod timestamp;
pub mod utils;
pub mod version;

pub use captured_packet::CapturedPacket;
pub use error::{FieldLengthError, FormatError};
pub use link_type::LinkType;
pub use version::Version;
