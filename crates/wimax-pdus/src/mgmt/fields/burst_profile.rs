use wimax_core::{ByteBuffer, ModulationType, PduParseErr};

/// Profile TLV type used for burst profiles in DCD and UCD
const BURST_PROFILE_TYPE: u8 = 1;
/// iuc + fec code type
const BURST_PROFILE_LEN: u8 = 2;

/// One downlink or uplink burst profile: `type u8, length u8, iuc u8, fec code type u8`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstProfile {
    /// DIUC in a DCD, UIUC in a UCD
    pub iuc: u8,
    pub fec_code_type: ModulationType,
}

impl BurstProfile {
    pub const SERIALIZED_SIZE: usize = 4;

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        buf.write_uint(BURST_PROFILE_TYPE as u64, 1);
        buf.write_uint(BURST_PROFILE_LEN as u64, 1);
        buf.write_uint(self.iuc as u64, 1);
        buf.write_uint(self.fec_code_type.into_raw(), 1);
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let profile_type = buf.read_field(1, "profile_type")?;
        if profile_type != BURST_PROFILE_TYPE as u64 {
            return Err(PduParseErr::InvalidValue { field: "profile_type", value: profile_type });
        }
        let length = buf.read_field(1, "profile_length")? as usize;
        if length != BURST_PROFILE_LEN as usize {
            return Err(PduParseErr::InconsistentLength { expected: BURST_PROFILE_LEN as usize, found: length });
        }
        let iuc = buf.read_field(1, "iuc")? as u8;
        let fec = buf.read_field(1, "fec_code_type")?;
        let fec_code_type =
            ModulationType::try_from(fec).map_err(|_| PduParseErr::InvalidValue { field: "fec_code_type", value: fec })?;
        Ok(BurstProfile { iuc, fec_code_type })
    }
}

/// Writes a count byte followed by the profiles
pub fn profiles_to_bytes(profiles: &[BurstProfile], buf: &mut ByteBuffer) {
    assert!(profiles.len() <= u8::MAX as usize, "too many burst profiles");
    buf.write_uint(profiles.len() as u64, 1);
    for p in profiles {
        p.to_bytes(buf);
    }
}

pub fn profiles_from_bytes(buf: &mut ByteBuffer) -> Result<Vec<BurstProfile>, PduParseErr> {
    let n = buf.read_field(1, "profile_count")? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(BurstProfile::from_bytes(buf)?);
    }
    Ok(out)
}
