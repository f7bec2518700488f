//! 解码器实现模块.

pub mod jpeg;
pub mod xa_adpcm;

use crate::codec_id::CodecId;
use crate::registry::CodecRegistry;

/// 注册所有内置解码器
pub fn register_all_decoders(registry: &mut CodecRegistry) {
    registry.register_decoder(
        CodecId::XaAdpcm,
        "adpcm_xa",
        xa_adpcm::XaAdpcmDecoder::create,
    );
    registry.register_decoder(CodecId::Jpeg, "jpeg", jpeg::JpegDecoder::create);
}
