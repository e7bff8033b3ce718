//! feint-payload - forged payload generation and the rotating payload
//! ring (spec.md §4.5).
//!
//! Each `PayloadDescriptor` expands into one or more concrete byte
//! buffers: most variants produce exactly one, but `HttpRandom`
//! generates a set of browser-like request variants per hostname and
//! `HttpZeroRate` expands to its fixed set of carrier templates.

pub mod error;
pub mod generate;
pub mod ring;
pub mod templates;

pub use error::{PayloadError, PayloadResult};
pub use ring::PayloadRing;

use feint_common::PayloadDescriptor;

/// Number of distinct variants generated per hostname for `HttpRandom`,
/// matching the original generator's intent of avoiding an obviously
/// repetitive fingerprint.
pub const HTTP_RANDOM_VARIANTS_PER_HOST: usize = 100;

/// Expand one descriptor into its concrete payload buffer(s).
pub fn expand(descriptor: &PayloadDescriptor) -> PayloadResult<Vec<Vec<u8>>> {
    match descriptor {
        PayloadDescriptor::Http(host) => Ok(vec![generate::http_get(host)?]),
        PayloadDescriptor::Https(host) | PayloadDescriptor::TlsClientHello(host) => {
            Ok(vec![generate::tls_client_hello(host)?])
        }
        PayloadDescriptor::Custom(path) => Ok(vec![generate::custom_file(path)?]),
        PayloadDescriptor::HttpRandom(host) => (0..HTTP_RANDOM_VARIANTS_PER_HOST)
            .map(|_| generate::http_random(host))
            .collect(),
        PayloadDescriptor::HttpSimple => Ok(vec![generate::http_simple()?]),
        PayloadDescriptor::HttpZeroRate => (0..templates::ZERORATE_TEMPLATES.len())
            .map(generate::http_zerorate)
            .collect(),
    }
}

/// Expand every descriptor in `descriptors` and build the shuffled
/// rotation ring the injection engine draws from.
pub fn build_ring(descriptors: &[PayloadDescriptor]) -> PayloadResult<PayloadRing> {
    let mut payloads = Vec::new();
    for descriptor in descriptors {
        payloads.extend(expand(descriptor)?);
    }
    PayloadRing::new(payloads)
}
