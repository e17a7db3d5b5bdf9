//! Link-layer header types from the tcpdump.org registry
//!
//! Only Ethernet is dissected. Every other value is still carried through so the
//! reader can report which interfaces were skipped.
macro_rules! link_type {
    (
        $(
            $(#[$docs:meta])*
            $name:ident = $value:literal
        ),*
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum LinkType {
            $(
                $(#[$docs])*
                $name,
            )*
            /// Any code not listed above
            Unknown(u16),
        }
        impl LinkType {
            /// The numeric code as written in capture files
            pub fn code(self) -> u16 {
                match self {
                    $(
                        LinkType::$name => $value,
                    )*
                    LinkType::Unknown(value) => value,
                }
            }
        }

        impl From<u16> for LinkType {
            fn from(value: u16) -> Self {
                match value {
                    $(
                        $value => LinkType::$name,
                    )*
                    other => LinkType::Unknown(other),
                }
            }
        }
    };
}
link_type! {
    Null = 0,
    /// IEEE 802.3 Ethernet
    Ethernet = 1,
    Ax25 = 3,
    Ieee802_5 = 6,
    Slip = 8,
    Ppp = 9,
    Fddi = 10,
    PppHdlc = 50,
    PppEther = 51,
    AtmRfc1483 = 100,
    /// Raw IP, no link-layer header
    Raw = 101,
    CHdlc = 104,
    Ieee802_11 = 105,
    Frelay = 107,
    Loop = 108,
    LinuxSll = 113,
    Pflog = 117,
    Ieee802_11Radiotap = 127,
    BluetoothHciH4 = 187,
    UsbLinux = 189,
    Ipv4 = 228,
    Ipv6 = 229,
    Netlink = 253,
    BluetoothLeLl = 251,
    LinuxSll2 = 276
}
impl Default for LinkType {
    fn default() -> Self {
        LinkType::Ethernet
    }
}
/// The pcap file header stores the link type in 32 bits, the upper half carries FCS flags
impl From<u32> for LinkType {
    fn from(value: u32) -> Self {
        LinkType::from((value & 0xFFFF) as u16)
    }
}
