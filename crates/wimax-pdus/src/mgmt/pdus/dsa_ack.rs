use core::fmt;

use wimax_core::expect_pdu_type;
use wimax_core::{ByteBuffer, PduParseErr};

use crate::mgmt::enums::management_message_type::ManagementMessageType;
use crate::sflow::enums::confirmation_code::ConfirmationCode;

/// DSA-ACK, closes the DSA handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsaAck {
    pub transaction_id: u16,
    pub confirmation_code: ConfirmationCode,
}

impl DsaAck {
    pub const SERIALIZED_SIZE: usize = 4;

    pub fn serialized_size(&self) -> usize {
        Self::SERIALIZED_SIZE
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let pdu_type = buf.read_field(1, "pdu_type")?;
        expect_pdu_type!(pdu_type, ManagementMessageType::DsaAck)?;

        let transaction_id = buf.read_field(2, "transaction_id")? as u16;
        let val = buf.read_field(1, "confirmation_code")?;
        let confirmation_code = ConfirmationCode::try_from(val)
            .map_err(|_| PduParseErr::InvalidValue { field: "confirmation_code", value: val })?;
        Ok(DsaAck { transaction_id, confirmation_code })
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        buf.write_uint(ManagementMessageType::DsaAck.into_raw(), 1);
        buf.write_uint(self.transaction_id as u64, 2);
        buf.write_uint(self.confirmation_code.into_raw(), 1);
    }
}

impl fmt::Display for DsaAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DsaAck {{ transaction_id: {} code: {} }}", self.transaction_id, self.confirmation_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsa_ack() {
        let test_vec = [13u8, 0x01, 0x02, 0x00];
        let mut buf_in = ByteBuffer::from_bytes(&test_vec);
        let pdu = DsaAck::from_bytes(&mut buf_in).expect("Failed parsing");
        assert_eq!(pdu, DsaAck { transaction_id: 0x0102, confirmation_code: ConfirmationCode::Success });

        let mut buf_out = ByteBuffer::new_autoexpand(4);
        pdu.to_bytes(&mut buf_out);
        assert_eq!(buf_out.as_slice(), &test_vec);

        let mut bad = ByteBuffer::from_bytes(&[13, 0, 1, 42]);
        assert_eq!(
            DsaAck::from_bytes(&mut bad),
            Err(PduParseErr::InvalidValue { field: "confirmation_code", value: 42 })
        );
    }
}
