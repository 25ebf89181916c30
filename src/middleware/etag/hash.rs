/// 응답 본문 해시 함수
pub trait BodyHasher: Send + Sync {
    fn hash(&self, data: &[u8]) -> u64;
}

/// 기본 해시 (32비트 djb2 변형)
#[derive(Debug, Clone, Copy, Default)]
pub struct JHash;

impl BodyHasher for JHash {
    fn hash(&self, data: &[u8]) -> u64 {
        jhash(data) as u64
    }
}

pub fn jhash(data: &[u8]) -> u32 {
    data.iter()
        .fold(5381u32, |hash, &b| hash.wrapping_mul(33) ^ b as u32)
}
