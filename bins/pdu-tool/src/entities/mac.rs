use wimax_core::{ByteBuffer, CidFactory, CidType};
use wimax_pdus::mac::{MacHeader, MacPdu};
use wimax_pdus::mgmt::MgmtMsg;

/// Parses a hex string, ignoring whitespace and `:` separators
pub fn bytes_from_hexstr(s: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<char> = s.chars().filter(|c| !c.is_whitespace() && *c != ':').collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits: {}", digits.len()));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).map_err(|_| format!("invalid hex byte '{}'", byte))
        })
        .collect()
}

/// MAC parser for standalone PDU debugging
pub struct MacParser {
    cids: CidFactory,
}

impl MacParser {
    /// `basic_cid_count` sets the basic/primary CID boundaries used to tell
    /// management connections from transport ones
    pub fn new(basic_cid_count: u16) -> Self {
        MacParser { cids: CidFactory::new(basic_cid_count) }
    }

    /// Parse a burst of back-to-back MAC PDUs and print the result. Unfragmented payloads
    /// on management connections are decoded as management messages.
    pub fn parse_burst(&self, data: Vec<u8>) {
        println!("=== MAC burst parser ===");
        println!("Input bytes: {}", data.len());
        println!();

        let mut buf = ByteBuffer::from_vec(data);
        let mut index = 0;
        while buf.get_len_remaining() > 0 {
            let start = buf.get_pos();
            let pdu = match MacPdu::from_bytes(&mut buf) {
                Ok(pdu) => pdu,
                Err(e) => {
                    println!("[!] PDU {} at offset {}: {:?}", index, start, e);
                    return;
                }
            };
            println!("PDU {} at offset {}: {}", index, start, pdu);
            match &pdu.header {
                MacHeader::Generic(hdr) => {
                    println!("    {}", hdr);
                    let cid_type = self.cids.cid_type(hdr.cid);
                    println!("    connection: {}", cid_type);
                    let is_mgmt = matches!(
                        cid_type,
                        CidType::InitialRanging | CidType::Broadcast | CidType::Basic | CidType::Primary
                    );
                    if is_mgmt && pdu.frag.is_none() {
                        Self::parse_mgmt(&pdu.payload);
                    } else if !pdu.payload.is_empty() {
                        println!("    payload: {}", ByteBuffer::from_bytes(&pdu.payload).dump_hex());
                    }
                }
                MacHeader::BandwidthRequest(_) => {}
            }
            index += 1;
        }
        println!();
        println!("{} PDU(s) decoded", index);
    }

    /// Parse a single management message and print it
    pub fn parse_mgmt(data: &[u8]) {
        let mut buf = ByteBuffer::from_bytes(data);
        match MgmtMsg::from_bytes(&mut buf) {
            Ok(msg) => println!("    {:?}: {:#?}", msg.msg_type(), msg),
            Err(e) => println!("    [!] management message: {:?} {}", e, buf.dump_hex()),
        }
    }
}
