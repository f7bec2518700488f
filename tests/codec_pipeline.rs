//! 端到端集成测试: 通过默认注册表创建解码器并解码.

use pdx::codec::decoders::xa_adpcm::{decode_sector, AdpcmState, OUTPUT_SAMPLE_RATE};
use pdx::codec::{CodecId, Frame, Packet};
use pdx::core::PdxError;

/// 每个声音组参数为 (移位 0, 滤波器 1), 样本全为 nibble 值 `n`
fn audio_payload(n: u8) -> Vec<u8> {
    let mut group = vec![0x10u8; 16];
    group.extend(std::iter::repeat_n(n | (n << 4), 112));
    group.repeat(18)
}

#[test]
fn test_默认注册表包含全部解码器() {
    let registry = pdx::default_codec_registry();
    let ids: Vec<CodecId> = registry.list_decoders().iter().map(|(id, _)| *id).collect();
    assert!(ids.contains(&CodecId::XaAdpcm));
    assert!(ids.contains(&CodecId::Jpeg));
    assert!(matches!(
        registry.create_decoder(CodecId::None),
        Err(PdxError::CodecNotFound(_))
    ));
    assert!(!pdx::version().is_empty());
}

#[test]
fn test_xa_adpcm_连续扇区保留预测状态() {
    let registry = pdx::default_codec_registry();
    let mut dec = registry.create_decoder(CodecId::XaAdpcm).unwrap();

    let mut state = AdpcmState::default();
    let mut expected = decode_sector(&audio_payload(2), &mut state);
    expected.extend(decode_sector(&audio_payload(5), &mut state));

    let mut decoded = Vec::new();
    for n in [2, 5] {
        dec.send_packet(&Packet::from_data(audio_payload(n))).unwrap();
        match dec.receive_frame().unwrap() {
            Frame::Audio(a) => {
                assert_eq!(a.sample_rate, OUTPUT_SAMPLE_RATE);
                assert_eq!(a.channels, 1);
                decoded.extend(a.samples_s16());
            }
            Frame::Video(_) => panic!("应输出音频帧"),
        }
    }
    assert_eq!(decoded, expected);

    dec.send_packet(&Packet::empty()).unwrap();
    assert!(matches!(dec.receive_frame(), Err(PdxError::Eof)));
}

#[test]
fn test_xa_adpcm_过短数据包() {
    let registry = pdx::default_codec_registry();
    let mut dec = registry.create_decoder(CodecId::XaAdpcm).unwrap();
    assert!(matches!(
        dec.send_packet(&Packet::from_data(vec![0u8; 100])),
        Err(PdxError::InvalidData(_))
    ));
}

#[test]
fn test_jpeg_解码完整图像() {
    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    let mut data = vec![0xFF, 0xD8];
    let mut dqt = vec![0];
    dqt.extend([16u8; 64]);
    data.extend(segment(0xDB, &dqt));
    data.extend(segment(0xC0, &[8, 0, 8, 0, 8, 1, 1, 0x11, 0]));
    let mut dc = vec![0x00, 0, 1];
    dc.extend([0u8; 14]);
    dc.push(3);
    data.extend(segment(0xC4, &dc));
    let mut ac = vec![0x10, 0, 0, 0, 1];
    ac.extend([0u8; 12]);
    ac.push(0);
    data.extend(segment(0xC4, &ac));
    data.extend(segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
    // DC 差值 -5: "00" + "010" + "0000", 其余位填 1
    data.extend([0x10, 0x7F, 0xFF, 0xD9]);

    let registry = pdx::default_codec_registry();
    let mut dec = registry.create_decoder(CodecId::Jpeg).unwrap();
    let mut packet = Packet::from_data(data);
    packet.pts = 7;
    dec.send_packet(&packet).unwrap();
    match dec.receive_frame().unwrap() {
        Frame::Video(v) => {
            assert_eq!(v.pts, 7);
            assert_eq!((v.width, v.height), (8, 8));
            // 128 + 2 * (-5)
            assert!(v.data.iter().all(|&b| b == 118));
        }
        Frame::Audio(_) => panic!("应输出视频帧"),
    }
}
