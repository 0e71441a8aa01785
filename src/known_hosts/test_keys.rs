// 测试用公钥与辅助函数

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use russh::keys::PublicKey;
use sha1::Sha1;

pub const KEY_A: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAICjT2SuA0k/xc5Cbyp+eBY5uN3bRL2K7GdpNtltOK6vy";

pub const KEY_B: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl";

pub fn public_key(openssh: &str) -> PublicKey {
    openssh.parse().expect("test key should parse")
}

/// 生成 `|1|salt|hash <key>` 形式的行
pub fn hashed_line(host: &str, key: &str) -> String {
    let salt = [7u8; 20];
    let mut mac = Hmac::<Sha1>::new_from_slice(&salt).expect("hmac accepts any key size");
    mac.update(host.as_bytes());
    let hash = mac.finalize().into_bytes();
    format!("|1|{}|{} {}", STANDARD.encode(salt), STANDARD.encode(hash), key)
}
