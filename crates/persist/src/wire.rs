//! Bit-exact recording wire format: the flat frame buffer as consecutive
//! little-endian IEEE-754 doubles, no header or footer.

use std::io::{Read, Write};

use saberline_kernel::{Recording, RecordingError};

const VALUE_BYTES: usize = std::mem::size_of::<f64>();

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{len} bytes is not a whole number of 64-bit values")]
    Truncated { len: usize },
    #[error("malformed recording: {0}")]
    Recording(#[from] RecordingError),
}

pub fn encode(recording: &Recording) -> Vec<u8> {
    let samples = recording.samples();
    let mut bytes = Vec::with_capacity(samples.len() * VALUE_BYTES);
    for value in samples {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

pub fn decode(bytes: &[u8]) -> Result<Recording, WireError> {
    if bytes.len() % VALUE_BYTES != 0 {
        return Err(WireError::Truncated { len: bytes.len() });
    }
    let samples = bytes
        .chunks_exact(VALUE_BYTES)
        .map(|chunk| {
            let mut raw = [0u8; VALUE_BYTES];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect();
    Ok(Recording::from_samples(samples)?)
}

/// Stream a recording out, e.g. for transfer after a live session.
pub fn write_recording(mut out: impl Write, recording: &Recording) -> Result<(), WireError> {
    out.write_all(&encode(recording))?;
    out.flush()?;
    Ok(())
}

pub fn read_recording(mut input: impl Read) -> Result<Recording, WireError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use saberline_kernel::{FRAME_FIELDS, RecordingFrame, RecordingWriter};

    fn sample_recording() -> Recording {
        let mut writer = RecordingWriter::new();
        for i in 0..5 {
            let mut frame = RecordingFrame {
                time: -1.0 + i as f64 / 90.0,
                ..Default::default()
            };
            frame.player.controllers[1].position.y = 1.0 + i as f64 * 0.1;
            frame.player.headset.rotation = glam::DQuat::from_xyzw(0.1, -0.2, 0.3, 0.9);
            writer.push(&frame);
        }
        writer.finish()
    }

    #[test]
    fn encoding_is_little_endian_doubles() {
        let rec = sample_recording();
        let bytes = encode(&rec);
        assert_eq!(bytes.len(), 5 * FRAME_FIELDS * 8);
        assert_eq!(&bytes[..8], &(-1.0f64).to_le_bytes());
    }

    #[test]
    fn decode_is_bit_exact() {
        let rec = sample_recording();
        let back = decode(&encode(&rec)).unwrap();
        let a: Vec<u64> = rec.samples().iter().map(|v| v.to_bits()).collect();
        let b: Vec<u64> = back.samples().iter().map(|v| v.to_bits()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn decode_rejects_partial_value() {
        assert!(matches!(decode(&[0u8; 12]), Err(WireError::Truncated { len: 12 })));
    }

    #[test]
    fn decode_rejects_partial_frame() {
        let bytes = vec![0u8; (FRAME_FIELDS + 1) * 8];
        assert!(matches!(
            decode(&bytes),
            Err(WireError::Recording(RecordingError::BadLength { .. }))
        ));
    }

    #[test]
    fn stream_round_trip() {
        let rec = sample_recording();
        let mut buf = Vec::new();
        write_recording(&mut buf, &rec).unwrap();
        assert_eq!(read_recording(buf.as_slice()).unwrap(), rec);
    }
}
