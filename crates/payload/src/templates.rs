//! Static templates: the plain HTTP GET format string, browser UA/Accept
//! profiles, zero-rating host/header presets, and the TLS 1.2
//! ClientHello skeleton. Grounded on `original_source/src/payload.c`.

pub const MAX_PAYLOAD_LEN: usize = 2000;

pub struct BrowserProfile {
    pub ua: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
    pub accept_encoding: &'static str,
    pub has_sec_fetch: bool,
    pub has_upgrade_insecure_requests: bool,
}

pub const BROWSER_PROFILES: &[BrowserProfile] = &[
    BrowserProfile {
        ua: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,\
                 image/avif,image/webp,image/apng,*/*;q=0.8,\
                 application/signed-exchange;v=b3;q=0.7",
        accept_language: "zh-CN,zh;q=0.9,en;q=0.8",
        accept_encoding: "gzip, deflate, br",
        has_sec_fetch: true,
        has_upgrade_insecure_requests: true,
    },
    BrowserProfile {
        ua: "Mozilla/5.0 (Linux; Android 13; Pixel 7 Pro) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/123.0.0.0 Mobile Safari/537.36",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,\
                 image/avif,image/webp,image/apng,*/*;q=0.8,\
                 application/signed-exchange;v=b3;q=0.7",
        accept_language: "zh-CN,zh;q=0.9,en;q=0.8",
        accept_encoding: "gzip, deflate, br",
        has_sec_fetch: true,
        has_upgrade_insecure_requests: true,
    },
    BrowserProfile {
        ua: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 \
             Firefox/123.0",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,\
                 image/avif,image/webp,*/*;q=0.8",
        accept_language: "zh-CN,zh;q=0.9,en;q=0.8",
        accept_encoding: "gzip, deflate, br",
        has_sec_fetch: false,
        has_upgrade_insecure_requests: false,
    },
    BrowserProfile {
        ua: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,\
                 image/avif,image/webp,image/apng,*/*;q=0.8",
        accept_language: "zh-CN,zh;q=0.9,en;q=0.8",
        accept_encoding: "gzip, deflate, br",
        has_sec_fetch: false,
        has_upgrade_insecure_requests: true,
    },
];

pub struct ZeroRateTemplate {
    pub host: &'static str,
    pub headers: &'static str,
}

pub const ZERORATE_TEMPLATES: &[ZeroRateTemplate] = &[
    ZeroRateTemplate {
        host: "vali-dns.cp31.ott.cibntv.net",
        headers: "Range: bytes=25165824-32586598\r\nAccept: */*",
    },
    ZeroRateTemplate {
        host: "ltevod.tv189.cn",
        headers: "Connection: Keep-Alive\r\nAccept-Encoding: gzip",
    },
    ZeroRateTemplate {
        host: "woif.10155.com",
        headers: "Accept-Encoding: gzip",
    },
    ZeroRateTemplate {
        host: "szminorshort.weixin.qq.com",
        headers: "Upgrade: mmtls\r\nAccept: */*\r\nConnection: close\r\n\
                   Content-Type: application/octet-stream",
    },
    ZeroRateTemplate {
        host: "adashbc.m.taobao.com",
        headers: "Accept-Encoding: gzip",
    },
    ZeroRateTemplate {
        host: "asp.cntv.myalicdn.com",
        headers: "Icy-MetaData: 1",
    },
    ZeroRateTemplate {
        host: "dm.toutiao.com",
        headers: "Connection: Keep-Alive\r\nAccept-Encoding: gzip",
    },
    ZeroRateTemplate {
        host: "tbcdn.hiphotos.baidu.com",
        headers: "needginfo: 1\r\nConnection: Keep-Alive\r\n\
                   User-Agent: bdtb for Android 9.0.8.0",
    },
    ZeroRateTemplate {
        host: "data.video.qiyi.com",
        headers: "Accept: */*",
    },
    ZeroRateTemplate {
        host: "apimeishi.meituan.com",
        headers: "Connection: Keep-Alive",
    },
    ZeroRateTemplate {
        host: "mps.amap.com",
        headers: "Connection: Keep-Alive\r\nAccept-Encoding: gzip",
    },
];

/// First 11 fixed bytes of the TLS 1.2 ClientHello record + handshake
/// header: content type, version, record length, handshake type,
/// handshake length, client version.
pub const TLS_HELLO_PREFIX: [u8; 11] = [
    0x16, 0x03, 0x03, 0x01, 0x81, 0x01, 0x00, 0x01, 0x7d, 0x03, 0x03,
];

/// Fixed bytes following the session id: cipher suite list, compression
/// methods, and the extensions that precede SNI/padding.
pub const TLS_HELLO_SUFFIX: [u8; 39] = [
    0x00, 0x02, 0xc0, 0x2b, 0x01, 0x00, 0x01, 0x32, 0x00, 0x0a, 0x00, 0x04, 0x00, 0x02, 0x00,
    0x17, 0x00, 0x0d, 0x00, 0x04, 0x00, 0x02, 0x04, 0x03, 0x00, 0x10, 0x00, 0x0b, 0x00, 0x09,
    0x08, b'h', b't', b't', b'p', b'/', b'1', b'.', b'1',
];

pub const TLS_SNI_REGION_LEN: usize = 275;
pub const TLS_RANDOM_LEN: usize = 32;
pub const TLS_SESSION_ID_LEN: usize = 32;

pub const HTTP_GET_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";
