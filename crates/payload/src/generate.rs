//! Payload generators, one per `PayloadDescriptor` variant. Grounded on
//! `original_source/src/payload.c`'s `make_http_get`,
//! `make_tls_client_hello`, `make_http_random`, `make_http_simple`, and
//! `make_http_zerorate_from_template`.

use rand::Rng;
use std::fmt::Write as _;

use crate::error::{PayloadError, PayloadResult};
use crate::templates::{
    BrowserProfile, ZeroRateTemplate, BROWSER_PROFILES, HTTP_GET_UA, TLS_HELLO_PREFIX,
    TLS_HELLO_SUFFIX, TLS_RANDOM_LEN, TLS_SESSION_ID_LEN, TLS_SNI_REGION_LEN, ZERORATE_TEMPLATES,
};

/// Plain `GET / HTTP/1.1` request carrying the given Host header.
pub fn http_get(hostname: &str) -> PayloadResult<Vec<u8>> {
    let text = format!(
        "GET / HTTP/1.1\r\nHost: {hostname}\r\nAccept: */*\r\nUser-Agent: {HTTP_GET_UA}\r\n\r\n"
    );
    Ok(text.into_bytes())
}

/// TLS 1.2 ClientHello with a random `random`/`session_id` and an SNI +
/// PADDING extension pair filling the fixed 275-byte tail region.
pub fn tls_client_hello(hostname: &str) -> PayloadResult<Vec<u8>> {
    let hostname_len = hostname.len();
    // server_name_head (9 bytes) + hostname + padding_head (4 bytes)
    let fixed_sni_overhead = 9 + 4;
    if hostname_len + fixed_sni_overhead > TLS_SNI_REGION_LEN {
        return Err(PayloadError::HostnameTooLong);
    }
    let padding_len = TLS_SNI_REGION_LEN - fixed_sni_overhead - hostname_len;

    let mut rng = rand::thread_rng();
    let mut buf = Vec::with_capacity(
        TLS_HELLO_PREFIX.len()
            + TLS_RANDOM_LEN
            + 1
            + TLS_SESSION_ID_LEN
            + TLS_HELLO_SUFFIX.len()
            + TLS_SNI_REGION_LEN,
    );

    buf.extend_from_slice(&TLS_HELLO_PREFIX);
    let mut random = [0u8; TLS_RANDOM_LEN];
    rng.fill(&mut random);
    buf.extend_from_slice(&random);
    buf.push(TLS_SESSION_ID_LEN as u8);
    let mut session_id = [0u8; TLS_SESSION_ID_LEN];
    rng.fill(&mut session_id);
    buf.extend_from_slice(&session_id);
    buf.extend_from_slice(&TLS_HELLO_SUFFIX);

    // server_name extension: type(2)=0, length(2), server_name_list_length(2),
    // server_name_type(1)=0, server_name_length(2), then the hostname bytes.
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&((hostname_len + 5) as u16).to_be_bytes());
    buf.extend_from_slice(&((hostname_len + 3) as u16).to_be_bytes());
    buf.push(0);
    buf.extend_from_slice(&(hostname_len as u16).to_be_bytes());
    buf.extend_from_slice(hostname.as_bytes());

    // padding extension: type(2)=21, length(2), then zero-filled padding.
    buf.extend_from_slice(&21u16.to_be_bytes());
    buf.extend_from_slice(&(padding_len as u16).to_be_bytes());
    buf.resize(buf.len() + padding_len, 0);

    Ok(buf)
}

fn rand_range(rng: &mut impl Rng, min: i64, max: i64) -> i64 {
    if max <= min {
        min
    } else {
        rng.gen_range(min..=max)
    }
}

fn rand_hex(rng: &mut impl Rng, len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    (0..len)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}

fn random_decimal(rng: &mut impl Rng) -> String {
    let r1 = rng.gen_range(0..1_000_000u64);
    let r2 = rng.gen_range(0..1_000_000u64);
    let r3 = rng.gen_range(0..100_000u64);
    format!("0.{r1:06}{r2:06}{r3:05}")
}

fn pick_profile<'a>(rng: &mut impl Rng) -> &'a BrowserProfile {
    let r = rand_range(rng, 0, 99);
    if r < 40 {
        &BROWSER_PROFILES[0]
    } else if r < 70 {
        &BROWSER_PROFILES[1]
    } else if r < 85 {
        &BROWSER_PROFILES[2]
    } else {
        &BROWSER_PROFILES[3]
    }
}

/// `-v`: simple random HTTP POST payload toward a fixed speed-test host.
pub fn http_simple() -> PayloadResult<Vec<u8>> {
    let mut rng = rand::thread_rng();
    let bp = pick_profile(&mut rng);

    let uri_r = random_decimal(&mut rng);
    let mut referer_r = random_decimal(&mut rng);
    while uri_r == referer_r {
        referer_r = random_decimal(&mut rng);
    }

    let mut out = String::new();
    let _ = write!(
        out,
        "POST /backend/empty.php?r={uri_r} HTTP/1.1\r\n\
         Host: test.ustc.edu.cn\r\n\
         User-Agent: {ua}\r\n\
         Referer: https://test.ustc.edu.cn/speedtest_worker.js.php?r={referer_r}\r\n\
         \r\n",
        ua = bp.ua
    );
    Ok(out.into_bytes())
}

fn cipher_like_body(rng: &mut impl Rng, len: usize) -> Vec<u8> {
    const CHARSET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())])
        .collect()
}

/// `-F`: one of 11 fixed carrier zero-rating templates, with a
/// randomly-chosen GET/POST method and (for POST) a random body.
pub fn http_zerorate(template_index: usize) -> PayloadResult<Vec<u8>> {
    let tpl: &ZeroRateTemplate = &ZERORATE_TEMPLATES[template_index % ZERORATE_TEMPLATES.len()];
    let mut rng = rand::thread_rng();
    let use_post = rng.gen_bool(0.5);
    let method = if use_post { "POST" } else { "GET" };

    let mut out = String::new();
    let _ = write!(out, "{method} / HTTP/1.1\r\nHost: {}\r\n{}\r\n", tpl.host, tpl.headers);

    let mut body = Vec::new();
    if use_post {
        let body_len = rand_range(&mut rng, 32, 96) as usize;
        body = cipher_like_body(&mut rng, body_len);
        let _ = write!(
            out,
            "Content-Type: application/octet-stream\r\nContent-Length: {body_len}\r\n"
        );
    }
    out.push_str("\r\n");

    let mut buf = out.into_bytes();
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// `-c`: one randomly-generated "real browser" HTTP request toward
/// `hostname`. Method weights follow the original generator's sampling:
/// 60% GET, 25% POST, 10% OPTIONS, 5% PUT.
pub fn http_random(hostname: &str) -> PayloadResult<Vec<u8>> {
    let mut rng = rand::thread_rng();
    let bp = pick_profile(&mut rng);

    let r = rand_range(&mut rng, 0, 99);
    let method = if r < 60 {
        "GET"
    } else if r < 85 {
        "POST"
    } else if r < 95 {
        "OPTIONS"
    } else {
        "PUT"
    };

    let path = random_path_for_method(&mut rng, method);
    let is_top_level = method == "GET" && rand_range(&mut rng, 0, 99) < 70;
    let has_origin = method == "POST" || method == "PUT" || !is_top_level;

    let mut out = String::new();
    let _ = write!(out, "{method} {path} HTTP/1.1\r\n");
    let _ = write!(out, "Host: {hostname}\r\n");
    let _ = write!(out, "Accept: {}\r\n", bp.accept);
    let _ = write!(out, "Accept-Language: {}\r\n", bp.accept_language);
    let _ = write!(out, "Accept-Encoding: {}\r\n", bp.accept_encoding);
    let _ = write!(out, "User-Agent: {}\r\n", bp.ua);

    if bp.has_upgrade_insecure_requests && method == "GET" {
        out.push_str("Upgrade-Insecure-Requests: 1\r\n");
    }
    if bp.has_sec_fetch {
        out.push_str("Sec-Fetch-Site: same-origin\r\n");
        out.push_str("Sec-Fetch-Mode: navigate\r\n");
        out.push_str("Sec-Fetch-Dest: document\r\n");
    }
    if has_origin {
        let _ = write!(out, "Origin: https://{hostname}\r\n");
        let _ = write!(out, "Referer: https://{hostname}/\r\n");
    }

    let mut body = Vec::new();
    if method == "POST" || method == "PUT" {
        body = cipher_like_body(&mut rng, rand_range(&mut rng, 16, 200) as usize);
        let _ = write!(out, "Content-Type: application/octet-stream\r\n");
        let _ = write!(out, "Content-Length: {}\r\n", body.len());
    }
    if method == "OPTIONS" {
        let target = if rand_range(&mut rng, 0, 1) == 0 {
            "GET"
        } else {
            "POST"
        };
        let _ = write!(out, "Access-Control-Request-Method: {target}\r\n");
    }

    out.push_str("\r\n");
    let mut buf = out.into_bytes();
    buf.extend_from_slice(&body);
    Ok(buf)
}

fn random_path_for_method(rng: &mut impl Rng, method: &str) -> String {
    match method {
        "GET" => random_carrier_uri(rng),
        "POST" => random_post_uri(rng),
        "PUT" => random_put_uri(rng),
        _ => "/".to_string(),
    }
}

fn random_carrier_uri(rng: &mut impl Rng) -> String {
    match rand_range(rng, 0, 2) {
        0 => {
            let c_id = rand_range(rng, 10_000_000, 99_999_999);
            let appid_hi = rand_range(rng, 100_000, 999_999);
            let appid_lo = rand_range(rng, 100_000, 999_999);
            let token = rand_hex(rng, 32);
            let devid = rand_range(rng, 0, 999_999);
            let (v1, v2, v3, v4) = (
                rand_range(rng, 1, 9),
                rand_range(rng, 0, 9),
                rand_range(rng, 0, 99),
                rand_range(rng, 0, 99),
            );
            let ctch = rand_range(rng, 1, 9);
            let channelid = rand_range(rng, 10_000_000, 99_999_999);
            format!(
                "/ik4g/v/C{c_id:08}.html?appid={appid_hi:06}{appid_lo:06}&token={token}&devid={devid:06}&version={v1}.{v2}.{v3}.{v4}ctch{ctch}&channelid={channelid:08}"
            )
        }
        1 => {
            let vdir = rand_range(rng, 1000, 9999);
            let (a, b, c) = (
                rand_range(rng, 10, 99),
                rand_range(rng, 10, 99),
                rand_range(rng, 10, 99),
            );
            let file_prefix = rand_range(rng, 1000, 9999);
            let (f1, f2, f3, f4) = (
                rand_range(rng, 10, 99),
                rand_range(rng, 10, 99),
                rand_range(rng, 10, 99),
                rand_range(rng, 1000, 9999),
            );
            let fs = rand_range(rng, 1_000_000, 99_999_999);
            let s = rand_range(rng, 100, 900);
            let id = rand_range(rng, 10_000_000, 99_999_999);
            let sid = rand_range(rng, 100_000_000, 999_999_999);
            let mb_a = rand_range(rng, 0, 99_999);
            let mb_b = rand_range(rng, 0, 99_999);
            format!(
                "/res/V/{vdir:04}/mp3/{a:02}/{b:02}/{c:02}/{file_prefix:04}{f1:02}{f2:02}{f3:02}{f4:04}.mp3?mb=1{mb_a:05}{mb_b:05}&fs={fs}&s={s}&n=&id={id}&M=online&sid={sid}"
            )
        }
        _ => {
            let access_token = rand_hex(rng, 32);
            let imsi_tail = rand_range(rng, 100_000_000, 999_999_999);
            let vc = rand_range(rng, 10, 300);
            let app_key = rand_range(rng, 1_000_000, 9_999_999);
            let channel_id = rand_range(rng, 10_000_000, 99_999_999);
            format!(
                "/api/v2/egame/log.json?access_token={access_token}&imsi=4600{imsi_tail:011}&vc={vc}&app_key={app_key}&channel_id={channel_id}"
            )
        }
    }
}

fn random_post_uri(rng: &mut impl Rng) -> String {
    let id = rand_range(rng, 10_000_000, 99_999_999);
    if rand_range(rng, 0, 1) == 0 {
        let session = if rand_range(rng, 0, 1) == 0 { "sess" } else { "auth" };
        format!("/api/v1/upload?file_id={id:08}&session={session}")
    } else {
        let token = if rand_range(rng, 0, 1) == 0 { "auth" } else { "token" };
        format!("/user/profile/update?uid={id:08}&token={token}")
    }
}

fn random_put_uri(rng: &mut impl Rng) -> String {
    let id = rand_range(rng, 10_000_000, 99_999_999);
    let r: u32 = rng.gen();
    if rand_range(rng, 0, 1) == 0 {
        format!("/log/collect?device_id={id:08}&ts={r}")
    } else {
        format!("/api/v2/report?event_id={id:08}&trace_id={r}")
    }
}

/// `-C <path>`: read raw bytes from a file, capped at the 2000-byte
/// payload buffer.
pub fn custom_file(path: &str) -> PayloadResult<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|source| PayloadError::CustomFileRead {
        path: path.to_string(),
        source,
    })?;
    if bytes.len() > crate::templates::MAX_PAYLOAD_LEN {
        return Err(PayloadError::CustomFileTooLarge {
            path: path.to_string(),
            len: bytes.len(),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_get_contains_host_header() {
        let buf = http_get("example.com").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("GET / HTTP/1.1\r\n"));
        assert!(text.contains("Host: example.com\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn tls_client_hello_has_fixed_length() {
        let buf = tls_client_hello("example.com").unwrap();
        assert_eq!(buf.len(), 11 + 32 + 1 + 32 + 39 + 275);
    }

    #[test]
    fn tls_client_hello_rejects_long_hostname() {
        let long = "a".repeat(300);
        assert!(matches!(
            tls_client_hello(&long),
            Err(PayloadError::HostnameTooLong)
        ));
    }

    #[test]
    fn http_zerorate_uses_requested_template_host() {
        let buf = http_zerorate(0).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Host: vali-dns.cp31.ott.cibntv.net\r\n"));
    }

    #[test]
    fn http_simple_targets_fixed_backend() {
        let buf = http_simple().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("POST /backend/empty.php?r=0."));
        assert!(text.contains("Host: test.ustc.edu.cn\r\n"));
    }

    #[test]
    fn http_random_produces_a_request_line() {
        let buf = http_random("example.com").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains(" HTTP/1.1\r\n"));
        assert!(text.contains("Host: example.com\r\n"));
    }
}
