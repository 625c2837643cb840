//! `realsense_msgs/StreamInfo`, published once per stream on `.../info`.

use anyhow::Result;

use super::{parse_string, read_u8, read_u32_le};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub fps: u32,
    pub encoding: String,
    pub is_recommended: bool,
}

pub fn parse_stream_info(payload: &[u8]) -> Result<StreamInfo> {
    let mut cursor = 0;
    let fps = read_u32_le(payload, &mut cursor)?;
    let encoding = parse_string(payload, &mut cursor)?;
    let is_recommended = read_u8(payload, &mut cursor)? != 0;
    Ok(StreamInfo { fps, encoding, is_recommended })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::test_payloads::push_string;

    #[test]
    fn test_parse_stream_info() {
        let mut payload = 30u32.to_le_bytes().to_vec();
        push_string(&mut payload, "mono16");
        payload.push(1);
        let info = parse_stream_info(&payload).unwrap();
        assert_eq!(
            info,
            StreamInfo { fps: 30, encoding: "mono16".to_string(), is_recommended: true }
        );
    }
}
