// FLV media tag headers

// Audio sound formats
pub const SOUND_FORMAT_AAC: u8 = 10;

// AAC packet types
pub const AAC_PACKET_TYPE_SEQUENCE_HEADER: u8 = 0;
pub const AAC_PACKET_TYPE_RAW: u8 = 1;

// Video frame types
pub const FRAME_TYPE_KEY: u8 = 1;
pub const FRAME_TYPE_INTER: u8 = 2;

// AVC packet types
pub const AVC_PACKET_TYPE_SEQUENCE_HEADER: u8 = 0;
pub const AVC_PACKET_TYPE_NALU: u8 = 1;

/// Header of an audio tag
#[derive(Clone, Copy)]
pub struct AudioTagHeader {
    /// Sound format (10 = AAC)
    pub sound_format: u8,

    /// Sound rate (0 = 5.5 kHz, 1 = 11 kHz, 2 = 22 kHz, 3 = 44 kHz)
    pub sound_rate: u8,

    /// Sample size (0 = 8 bit, 1 = 16 bit)
    pub sound_size: u8,

    /// Channels (0 = mono, 1 = stereo)
    pub sound_type: u8,

    /// AAC packet type (0 = sequence header, 1 = raw)
    /// Only meaningful when sound_format is AAC
    pub aac_packet_type: u8,
}

/// Header of a video tag
#[derive(Clone, Copy)]
pub struct VideoTagHeader {
    /// Frame type (1 = key frame, 2 = inter frame)
    pub frame_type: u8,

    /// Video codec ID (7 = AVC)
    pub codec_id: u8,

    /// AVC packet type (0 = sequence header, 1 = NALU, 2 = end of sequence)
    pub avc_packet_type: u8,

    /// Composition time offset
    pub composition_time: i32,
}

impl VideoTagHeader {
    /// Returns true for a key frame
    pub fn is_key_frame(&self) -> bool {
        self.frame_type == FRAME_TYPE_KEY
    }

    /// Returns true for a codec configuration packet
    pub fn is_sequence_header(&self) -> bool {
        self.is_key_frame() && self.avc_packet_type == AVC_PACKET_TYPE_SEQUENCE_HEADER
    }
}

/// Parsed media tag header
#[derive(Clone, Copy)]
pub enum MediaTagHeader {
    Audio(AudioTagHeader),
    Video(VideoTagHeader),
}

/// Parses the header of an audio tag
///
/// # Arguments
///
/// * `body` - Body of the audio message
///
/// # Return value
///
/// Returns the parsed header, or Err for a body too short to carry one
pub fn parse_audio_tag_header(body: &[u8]) -> Result<AudioTagHeader, ()> {
    if body.is_empty() {
        return Err(());
    }

    let flags = body[0];

    let mut header = AudioTagHeader {
        sound_format: flags >> 4,
        sound_rate: (flags >> 2) & 0x03,
        sound_size: (flags >> 1) & 0x01,
        sound_type: flags & 0x01,
        aac_packet_type: AAC_PACKET_TYPE_RAW,
    };

    if header.sound_format == SOUND_FORMAT_AAC {
        if body.len() < 2 {
            return Err(());
        }

        header.aac_packet_type = body[1];
    }

    Ok(header)
}

/// Parses the header of a video tag
///
/// # Arguments
///
/// * `body` - Body of the video message
///
/// # Return value
///
/// Returns the parsed header, or Err for a body too short to carry one
pub fn parse_video_tag_header(body: &[u8]) -> Result<VideoTagHeader, ()> {
    if body.is_empty() {
        return Err(());
    }

    let flags = body[0];

    let mut header = VideoTagHeader {
        frame_type: flags >> 4,
        codec_id: flags & 0x0f,
        avc_packet_type: 0,
        composition_time: 0,
    };

    if header.frame_type == FRAME_TYPE_KEY || header.frame_type == FRAME_TYPE_INTER {
        if body.len() < 5 {
            return Err(());
        }

        header.avc_packet_type = body[1];

        let mut composition_time: i32 = 0;

        for b in &body[2..5] {
            composition_time = (composition_time << 8) | (*b as i32);
        }

        header.composition_time = composition_time;
    }

    Ok(header)
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_audio_tag_header() {
        // AAC, 44 kHz, 16 bit, stereo, sequence header
        let header = parse_audio_tag_header(&[0xaf, 0x00, 0x12, 0x10]).unwrap();

        assert_eq!(header.sound_format, SOUND_FORMAT_AAC);
        assert_eq!(header.sound_rate, 3);
        assert_eq!(header.sound_size, 1);
        assert_eq!(header.sound_type, 1);
        assert_eq!(header.aac_packet_type, AAC_PACKET_TYPE_SEQUENCE_HEADER);

        // AAC raw frame
        let header = parse_audio_tag_header(&[0xaf, 0x01, 0x21, 0x00]).unwrap();
        assert_eq!(header.aac_packet_type, AAC_PACKET_TYPE_RAW);

        // AAC body missing the packet type byte
        assert!(parse_audio_tag_header(&[0xaf]).is_err());
        assert!(parse_audio_tag_header(&[]).is_err());

        // MP3 has no AAC packet type byte
        let header = parse_audio_tag_header(&[0x2f]).unwrap();
        assert_eq!(header.sound_format, 2);
    }

    #[test]
    fn test_parse_video_tag_header() {
        // AVC key frame, sequence header
        let header = parse_video_tag_header(&[0x17, 0x00, 0x00, 0x00, 0x00, 0x01]).unwrap();

        assert_eq!(header.frame_type, FRAME_TYPE_KEY);
        assert_eq!(header.codec_id, 7);
        assert!(header.is_key_frame());
        assert!(header.is_sequence_header());

        // AVC key frame, NALU, with composition time
        let header = parse_video_tag_header(&[0x17, 0x01, 0x00, 0x00, 0x21, 0x00]).unwrap();

        assert!(header.is_key_frame());
        assert!(!header.is_sequence_header());
        assert_eq!(header.composition_time, 0x21);

        // AVC inter frame
        let header = parse_video_tag_header(&[0x27, 0x01, 0x00, 0x00, 0x00, 0x00]).unwrap();

        assert!(!header.is_key_frame());
        assert_eq!(header.frame_type, FRAME_TYPE_INTER);

        // Too short for an AVC frame
        assert!(parse_video_tag_header(&[0x17, 0x01]).is_err());
    }
}
