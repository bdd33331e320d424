//! RFC 1924 アルファベットによる base-85 エンコード

const ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

/// 4バイトのビッグエンディアン整数を5文字にエンコードする
pub fn encode_u32(value: u32) -> [u8; 5] {
    let mut out = [0u8; 5];
    let mut rest = value;
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(rest % 85) as usize];
        rest /= 85;
    }
    out
}

/// 4バイト単位のデータをエンコードする（端数はゼロ詰めして出力を切り詰める）
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len().div_ceil(4) * 5);
    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        let encoded = encode_u32(u32::from_be_bytes(word));
        out.extend_from_slice(&encoded[..chunk.len() + 1]);
    }
    out
}
