use wimax_core::{ByteBuffer, PduParseErr};

use super::enums::fragmentation_control::FragmentationControl;

pub const FRAG_SUBHEADER_LEN: usize = 2;

/// Fragmentation subheader: `FC(2) | FSN(11) | rsv(3)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentationSubheader {
    pub fc: FragmentationControl,
    /// Fragment number within the SDU, 11 bits
    pub fsn: u16,
}

impl FragmentationSubheader {
    pub fn serialized_size(&self) -> usize {
        FRAG_SUBHEADER_LEN
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        let fsn = self.fsn & 0x07FF;
        let v = ((self.fc.into_raw() as u16) << 14) | (fsn << 3);
        buf.write_uint(v as u64, 2);
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let v = buf.read_field(2, "fragmentation_subheader")?;
        // 2-bit field, all values valid
        let fc = FragmentationControl::try_from(v >> 14).unwrap_or(FragmentationControl::NoFragmentation);
        Ok(FragmentationSubheader { fc, fsn: ((v >> 3) & 0x07FF) as u16 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let sh = FragmentationSubheader { fc: FragmentationControl::First, fsn: 0x7FF };
        let mut buf = ByteBuffer::new_autoexpand(2);
        sh.to_bytes(&mut buf);
        assert_eq!(buf.as_slice(), &[0xBF, 0xF8]);
        buf.seek(0);
        assert_eq!(FragmentationSubheader::from_bytes(&mut buf).unwrap(), sh);
    }
}
