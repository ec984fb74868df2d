//! H.264 bitstream rewriting for `V_MPEG4/ISO/AVC` tracks.
//!
//! Matroska stores AVC frames as length-prefixed NAL units with the
//! parameter sets in the track's `avcC` CodecPrivate. Decoders that expect
//! an elementary stream want Annex-B start codes instead, with SPS/PPS in
//! band before the first frame they see.

/// Annex-B start code.
pub const ANNEXB_START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Parsed `AVCDecoderConfigurationRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcConfig {
    pub profile: u8,
    pub level: u8,
    /// Bytes in each NAL length prefix (1, 2 or 4).
    pub nal_length_size: u8,
    pub sps: Vec<Vec<u8>>,
    pub pps: Vec<Vec<u8>>,
}

impl AvcConfig {
    /// Parse an `avcC` record. Returns `None` if it is truncated or not
    /// version 1.
    ///
    /// ```text
    /// [version=1][profile][compat][level][0xFC | lengthSizeMinusOne]
    /// [0xE0 | numSPS] { [u16 len][SPS] }*
    /// [numPPS]        { [u16 len][PPS] }*
    /// ```
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 6 || data[0] != 1 {
            return None;
        }
        let nal_length_size = (data[4] & 0x03) + 1;
        if nal_length_size == 3 {
            return None;
        }

        let mut pos = 6;
        let sps = read_parameter_sets(data, &mut pos, (data[5] & 0x1F) as usize)?;
        let pps_count = *data.get(pos)? as usize;
        pos += 1;
        let pps = read_parameter_sets(data, &mut pos, pps_count)?;

        Some(Self {
            profile: data[1],
            level: data[3],
            nal_length_size,
            sps,
            pps,
        })
    }

    /// Replace NAL length prefixes with start codes. A trailing NAL unit
    /// whose length runs past the frame is dropped.
    pub fn to_annexb(&self, frame: &[u8]) -> Vec<u8> {
        let prefix = self.nal_length_size as usize;
        let mut out = Vec::with_capacity(frame.len() + 16);
        let mut pos = 0;

        while pos + prefix <= frame.len() {
            let len = frame[pos..pos + prefix]
                .iter()
                .fold(0usize, |acc, &b| (acc << 8) | b as usize);
            pos += prefix;
            if pos + len > frame.len() {
                tracing::warn!(len, remaining = frame.len() - pos, "Truncated NAL unit");
                break;
            }
            out.extend_from_slice(&ANNEXB_START_CODE);
            out.extend_from_slice(&frame[pos..pos + len]);
            pos += len;
        }
        out
    }

    /// Prefix an Annex-B frame with every SPS and PPS.
    pub fn prepend_parameter_sets(&self, annexb: &[u8]) -> Vec<u8> {
        let extra: usize = self
            .sps
            .iter()
            .chain(&self.pps)
            .map(|nal| nal.len() + ANNEXB_START_CODE.len())
            .sum();
        let mut out = Vec::with_capacity(extra + annexb.len());
        for nal in self.sps.iter().chain(&self.pps) {
            out.extend_from_slice(&ANNEXB_START_CODE);
            out.extend_from_slice(nal);
        }
        out.extend_from_slice(annexb);
        out
    }
}

fn read_parameter_sets(data: &[u8], pos: &mut usize, count: usize) -> Option<Vec<Vec<u8>>> {
    let mut sets = Vec::with_capacity(count);
    for _ in 0..count {
        let len_bytes = data.get(*pos..*pos + 2)?;
        let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        *pos += 2;
        sets.push(data.get(*pos..*pos + len)?.to_vec());
        *pos += len;
    }
    Some(sets)
}
