//! feint-engine - the injection engine (spec.md §4.7): the hot path
//! that dispatches on direction and TCP flags, decides whether and
//! where to inject a forged segment, and applies the verdict.
//!
//! [`InjectionEngine`] is generic over [`Emitter`] so the dispatch
//! logic can be driven in tests without opening real sockets; the CLI
//! wires it up with [`RawEmitter`].

pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod ifname;

pub use emitter::{Emitter, RawEmitter};
pub use error::{EngineError, EngineResult};

use std::net::IpAddr;

use tracing::{debug, trace, warn};

use feint_common::{hop_estimate, tcp_flags, Direction, EngineConfig, PacketView, Verdict};
use feint_conntrack::{ConnTrack, FlowKey};
use feint_emit::LinkAddr;
use feint_payload::PayloadRing;
use feint_queue::{HandleOutcome, PacketContext, PacketHandler};
use feint_srcinfo::SrcInfoCache;

/// Cap on a forged segment's total size: headers plus the largest
/// payload the ring can hold (spec.md §4.2's ~2KB descriptor bound).
const MAX_FORGED_SEGMENT: usize = 2048;

/// Owns every mutable per-process cache the engine consults:
/// the payload ring, the source-info cache, and the local conntrack
/// table. Constructed once at startup; there is exactly one instance
/// per process (spec.md §5: single-threaded, no locking).
pub struct InjectionEngine<E: Emitter> {
    cfg: EngineConfig,
    ring: PayloadRing,
    srcinfo: SrcInfoCache,
    conntrack: ConnTrack,
    emitter: E,
    iptables_mode: bool,
}

impl<E: Emitter> InjectionEngine<E> {
    pub fn new(cfg: EngineConfig, emitter: E, iptables_mode: bool) -> EngineResult<Self> {
        let ring = feint_payload::build_ring(&cfg.payload_descriptors)?;
        let threshold = cfg.packet_count_threshold;
        Ok(Self {
            cfg,
            ring,
            srcinfo: SrcInfoCache::new(),
            conntrack: ConnTrack::new(threshold),
            emitter,
            iptables_mode,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    fn family_enabled(&self, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(_) => self.cfg.use_ipv4,
            IpAddr::V6(_) => self.cfg.use_ipv6,
        }
    }

    /// Build one forged segment into a stack buffer and hand it to the
    /// emitter `repeat` times. Each repeat gets a fresh random IP ID
    /// from `feint_codec::build`, matching the original's behavior of
    /// calling the segment builder once per send rather than reusing
    /// one buffer. Individual send failures are logged and do not
    /// abort the remaining repeats (spec.md §7, "emit failure during
    /// repeat").
    #[allow(clippy::too_many_arguments)]
    fn forge_and_repeat(
        &self,
        repeat: u32,
        src: IpAddr,
        dst: IpAddr,
        ttl: u8,
        sport: u16,
        dport: u16,
        seq: u32,
        ack: u32,
        payload: &[u8],
        target: SendTarget<'_>,
        ethertype: u16,
    ) {
        let mut buf = [0u8; MAX_FORGED_SEGMENT];
        for _ in 0..repeat {
            let len = match feint_codec::build(&mut buf, src, dst, ttl, sport, dport, seq, ack, true, payload) {
                Ok(len) => len,
                Err(e) => {
                    warn!(error = %e, "failed to build forged segment");
                    continue;
                }
            };
            let result = match target {
                SendTarget::Link(addr) => self.emitter.send_link(addr, ethertype, &buf[..len]),
                SendTarget::Snat { ifname } => {
                    self.emitter.send_snat(dst, ifname, self.cfg.fwmark, &buf[..len])
                }
            };
            if let Err(e) = result {
                warn!(error = %e, src = %src, dst = %dst, "forged segment send failed");
            } else {
                log_forgery(src, sport, dst, dport);
            }
        }
    }

    /// Re-emit an already-built packet's bytes verbatim (the SYN-ACK
    /// drop-and-reemit dance in case 2).
    fn reemit_original(&self, dst: IpAddr, bytes: &[u8], target: SendTarget<'_>, ethertype: u16) {
        let result = match target {
            SendTarget::Link(addr) => self.emitter.send_link(addr, ethertype, bytes),
            SendTarget::Snat { ifname } => {
                self.emitter.send_snat(dst, ifname, self.cfg.fwmark, bytes)
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to re-emit original SYN-ACK");
        }
    }

    fn link_addr_for_ctx(ctx: &PacketContext<'_>) -> LinkAddr {
        LinkAddr {
            ifindex: ctx.link_ifindex,
            halen: ctx.link_halen,
            addr: ctx.link_addr,
            pkttype: match ctx.direction {
                Direction::ToHost => libc::PACKET_OUTGOING as u8,
                Direction::FromHost => libc::PACKET_HOST as u8,
            },
        }
    }

    /// Reconstruct a link-layer address for the remote peer from a
    /// cached srcinfo entry, reusing the current packet's egress
    /// interface (the same physical link typically serves both
    /// directions of one middlebox-observed connection).
    fn link_addr_from_srcinfo(ifindex: i32, hwaddr: [u8; 8]) -> LinkAddr {
        let halen = if hwaddr == [0u8; 8] { 0 } else { 6 };
        LinkAddr {
            ifindex,
            halen,
            addr: hwaddr,
            pkttype: libc::PACKET_OUTGOING as u8,
        }
    }

    fn handle_packet(&mut self, ctx: &PacketContext<'_>) -> HandleOutcome {
        let view = match feint_codec::parse(ctx.bytes) {
            Ok(view) => view,
            Err(e) => {
                debug!(error = %e, "failed to parse packet, passing through");
                return accept();
            }
        };

        if !self.family_enabled(view.src) {
            trace!(addr = %view.src, "address family disabled, passing through");
            return accept();
        }

        let tcp = view.tcp;
        if tcp.has(tcp_flags::SYN) {
            if tcp.has(tcp_flags::ACK) {
                match ctx.direction {
                    Direction::FromHost => self.case1_outbound_synack(ctx, &view),
                    Direction::ToHost => self.case2_inbound_synack(ctx, &view),
                }
            } else {
                match ctx.direction {
                    Direction::FromHost => self.case3_inbound_syn(ctx, &view),
                    Direction::ToHost => self.case4_outbound_syn(ctx, &view),
                }
            }
        } else if tcp.is_fin_or_rst() {
            self.case7_teardown(&view)
        } else {
            match ctx.direction {
                Direction::FromHost => self.case5_outbound_established(ctx, &view),
                Direction::ToHost => self.case6_inbound_established(ctx, &view),
            }
        }
    }

    /// Case 1: from-host SYN+ACK, peer accepted our outbound connection.
    fn case1_outbound_synack(&mut self, ctx: &PacketContext<'_>, view: &PacketView<'_>) -> HandleOutcome {
        if !self.cfg.process_outbound {
            return accept();
        }
        if self.cfg.is_local(view.ttl) {
            return accept();
        }
        let ttl = self.cfg.forged_ttl(hop_estimate(view.ttl));
        let payload = self.ring.next().to_vec();
        let (seq, ack) = dispatch::outbound_synack_seq_ack(view.tcp.seq, view.tcp.ack);
        let local = view.dst;
        let peer = view.src;
        let link = Self::link_addr_for_ctx(ctx);
        self.forge_and_repeat(
            self.cfg.repeat,
            local,
            peer,
            ttl,
            view.tcp.dst_port,
            view.tcp.src_port,
            seq,
            ack,
            &payload,
            SendTarget::Link(link),
            ctx.ethertype,
        );
        accept()
    }

    /// Case 2: to-host SYN+ACK, our reply to a remote connection
    /// initiator. Injects, then deliberately drops and re-emits the
    /// original so the forged segment lands first.
    fn case2_inbound_synack(&mut self, ctx: &PacketContext<'_>, view: &PacketView<'_>) -> HandleOutcome {
        if !self.cfg.process_inbound {
            return accept();
        }
        let remote = view.dst;
        let Some((cached_ttl, hwaddr)) = self.srcinfo.get(remote) else {
            return accept();
        };
        if self.cfg.is_local(cached_ttl) {
            return accept();
        }

        let ifname = if self.iptables_mode {
            ifname::resolve(ctx.link_ifindex)
        } else {
            None
        };
        if self.iptables_mode && ifname.is_none() {
            warn!(ifindex = ctx.link_ifindex, "could not resolve interface name for SNAT fallback");
            return accept();
        }

        let ttl = self.cfg.forged_ttl(hop_estimate(cached_ttl));
        let payload = self.ring.next().to_vec();
        let (seq, ack) = dispatch::inbound_synack_seq_ack(view.tcp.seq, view.tcp.ack);
        let local = view.src;

        let target = match &ifname {
            Some(name) => SendTarget::Snat { ifname: name },
            None => SendTarget::Link(Self::link_addr_from_srcinfo(ctx.link_ifindex, hwaddr)),
        };
        self.forge_and_repeat(
            self.cfg.repeat,
            local,
            remote,
            ttl,
            view.tcp.src_port,
            view.tcp.dst_port,
            seq,
            ack,
            &payload,
            target,
            ctx.ethertype,
        );
        self.reemit_original(remote, ctx.bytes, target, ctx.ethertype);

        HandleOutcome {
            verdict: Verdict::Drop,
            modified_bytes: None,
        }
    }

    /// Case 3: from-host SYN only, a new inbound connection. Records
    /// srcinfo for the remote initiator and strips any TFO cookie.
    fn case3_inbound_syn(&mut self, ctx: &PacketContext<'_>, view: &PacketView<'_>) -> HandleOutcome {
        if !self.cfg.process_inbound {
            return accept();
        }
        self.srcinfo.put(view.src, view.ttl, ctx.link_addr);
        strip_and_accept(ctx.bytes)
    }

    /// Case 4: to-host SYN only, our own outbound connection attempt.
    fn case4_outbound_syn(&mut self, ctx: &PacketContext<'_>, _view: &PacketView<'_>) -> HandleOutcome {
        if !self.cfg.process_outbound {
            return accept();
        }
        strip_and_accept(ctx.bytes)
    }

    /// Case 5: from-host established segment. Bumps conntrack
    /// regardless of configuration; injects only once the threshold
    /// fires and outbound injection is enabled.
    fn case5_outbound_established(&mut self, ctx: &PacketContext<'_>, view: &PacketView<'_>) -> HandleOutcome {
        let key = flow_key(view);
        let threshold_reached = self.conntrack.increment(key);

        if threshold_reached && self.cfg.process_outbound && !self.cfg.is_local(view.ttl) {
            let ttl = self.cfg.forged_ttl(hop_estimate(view.ttl));
            let payload = self.ring.next().to_vec();
            let (seq, ack) = dispatch::outbound_established_seq_ack(view.tcp.seq, view.tcp.ack, view.tcp_payload_len);
            let local = view.dst;
            let peer = view.src;
            let link = Self::link_addr_for_ctx(ctx);
            self.forge_and_repeat(
                self.cfg.repeat,
                local,
                peer,
                ttl,
                view.tcp.dst_port,
                view.tcp.src_port,
                seq,
                ack,
                &payload,
                SendTarget::Link(link),
                ctx.ethertype,
            );
        }
        accept()
    }

    /// Case 6: to-host established segment. Mirrors case 5 with the
    /// inbound guard and a srcinfo lookup for the remote's cached TTL
    /// and hardware address.
    fn case6_inbound_established(&mut self, ctx: &PacketContext<'_>, view: &PacketView<'_>) -> HandleOutcome {
        let key = flow_key(view);
        let threshold_reached = self.conntrack.increment(key);

        if threshold_reached && self.cfg.process_inbound {
            let remote = view.dst;
            if let Some((cached_ttl, hwaddr)) = self.srcinfo.get(remote) {
                if !self.cfg.is_local(cached_ttl) {
                    let ifname = if self.iptables_mode {
                        ifname::resolve(ctx.link_ifindex)
                    } else {
                        None
                    };
                    if !(self.iptables_mode && ifname.is_none()) {
                        let ttl = self.cfg.forged_ttl(hop_estimate(cached_ttl));
                        let payload = self.ring.next().to_vec();
                        let (seq, ack) = dispatch::inbound_established_seq_ack(view.tcp.seq, view.tcp.ack);
                        let local = view.src;
                        let target = match &ifname {
                            Some(name) => SendTarget::Snat { ifname: name },
                            None => SendTarget::Link(Self::link_addr_from_srcinfo(ctx.link_ifindex, hwaddr)),
                        };
                        self.forge_and_repeat(
                            self.cfg.repeat,
                            local,
                            remote,
                            ttl,
                            view.tcp.src_port,
                            view.tcp.dst_port,
                            seq,
                            ack,
                            &payload,
                            target,
                            ctx.ethertype,
                        );
                    }
                }
            }
        }
        accept()
    }

    /// Case 7: FIN or RST in either direction tears down local
    /// conntrack state for the 5-tuple.
    fn case7_teardown(&mut self, view: &PacketView<'_>) -> HandleOutcome {
        self.conntrack.remove(&flow_key(view));
        accept()
    }
}

impl<E: Emitter> PacketHandler for InjectionEngine<E> {
    fn handle(&mut self, ctx: PacketContext<'_>) -> HandleOutcome {
        self.handle_packet(&ctx)
    }
}

#[derive(Clone, Copy)]
enum SendTarget<'a> {
    Link(LinkAddr),
    Snat { ifname: &'a str },
}

fn flow_key(view: &PacketView<'_>) -> FlowKey {
    FlowKey {
        saddr: view.src,
        daddr: view.dst,
        sport: view.tcp.src_port,
        dport: view.tcp.dst_port,
    }
}

fn accept() -> HandleOutcome {
    HandleOutcome {
        verdict: Verdict::Accept,
        modified_bytes: None,
    }
}

fn strip_and_accept(bytes: &[u8]) -> HandleOutcome {
    let mut buf = bytes.to_vec();
    let modified = feint_codec::strip_tfo_cookie(&mut buf).unwrap_or(false);
    HandleOutcome {
        verdict: Verdict::Accept,
        modified_bytes: if modified { Some(buf) } else { None },
    }
}

/// `SRC:PORT <===FAKE(*)=== DST:PORT`, the forged-segment log mnemonic
/// from spec.md §7.
fn log_forgery(src: IpAddr, sport: u16, dst: IpAddr, dport: u16) {
    debug!("{src}:{sport} <===FAKE(*)=== {dst}:{dport}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::net::Ipv4Addr;

    use feint_common::{InterfaceScope, PayloadDescriptor};
    use feint_emit::EmitResult;

    #[derive(Default)]
    struct RecordingEmitter {
        link_sends: RefCell<Vec<(LinkAddr, u16, Vec<u8>)>>,
        snat_sends: RefCell<Vec<(IpAddr, String, u32, Vec<u8>)>>,
    }

    impl Emitter for RecordingEmitter {
        fn send_link(&self, addr: LinkAddr, ethertype: u16, bytes: &[u8]) -> EmitResult<()> {
            self.link_sends.borrow_mut().push((addr, ethertype, bytes.to_vec()));
            Ok(())
        }

        fn send_snat(&self, dst: IpAddr, ifname: &str, mark: u32, bytes: &[u8]) -> EmitResult<()> {
            self.snat_sends
                .borrow_mut()
                .push((dst, ifname.to_string(), mark, bytes.to_vec()));
            Ok(())
        }
    }

    fn base_config(repeat: u32, base_ttl: u8, threshold: u32) -> EngineConfig {
        EngineConfig {
            process_inbound: true,
            process_outbound: true,
            use_ipv4: true,
            use_ipv6: true,
            interfaces: InterfaceScope::All,
            repeat,
            base_ttl,
            dynamic_ttl_pct: 0,
            no_hop_estimate: false,
            fwmark: 0x4000,
            fwmask: 0x4000,
            queue_num: 0,
            packet_count_threshold: threshold,
            use_iptables: false,
            skip_firewall: true,
            payload_descriptors: vec![PayloadDescriptor::Http("example.com".into())],
            snat_iface: None,
        }
    }

    fn build_tcp(
        src: Ipv4Addr,
        dst: Ipv4Addr,
        sport: u16,
        dport: u16,
        seq: u32,
        ack: u32,
        flags: u8,
        ttl: u8,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut buf = vec![0u8; 1600];
        let len = feint_codec::build(
            &mut buf,
            IpAddr::V4(src),
            IpAddr::V4(dst),
            ttl,
            sport,
            dport,
            seq,
            ack,
            false,
            payload,
        )
        .unwrap();
        // build() always sets ACK; overwrite the flags byte directly to
        // get SYN/SYN+ACK/FIN/RST test fixtures without reimplementing
        // the codec's checksum dance (tests don't depend on checksum
        // validity, only on the engine's flag-based dispatch).
        buf[33] = flags;
        buf.truncate(len);
        buf
    }

    fn ctx<'a>(direction: Direction, bytes: &'a [u8]) -> PacketContext<'a> {
        PacketContext {
            direction,
            ethertype: libc::ETH_P_IP as u16,
            link_ifindex: 2,
            link_halen: 6,
            link_addr: [1, 2, 3, 4, 5, 6, 0, 0],
            bytes,
        }
    }

    #[test]
    fn case1_injects_repeat_segments_and_accepts() {
        let cfg = base_config(2, 3, 32);
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();

        let bytes = build_tcp(
            Ipv4Addr::new(203, 0, 113, 10),
            Ipv4Addr::new(192, 0, 2, 5),
            443,
            54321,
            0x1000_0000,
            0x2000_0001,
            tcp_flags::SYN | tcp_flags::ACK,
            54,
            &[],
        );
        let outcome = engine.handle(ctx(Direction::FromHost, &bytes));

        assert_eq!(outcome.verdict, Verdict::Accept);
        assert_eq!(engine.emitter.link_sends.borrow().len(), 2);
    }

    #[test]
    fn case1_suppressed_when_outbound_disabled() {
        let mut cfg = base_config(2, 3, 32);
        cfg.process_outbound = false;
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();

        let bytes = build_tcp(
            Ipv4Addr::new(203, 0, 113, 10),
            Ipv4Addr::new(192, 0, 2, 5),
            443,
            54321,
            0x1000_0000,
            0x2000_0001,
            tcp_flags::SYN | tcp_flags::ACK,
            54,
            &[],
        );
        let outcome = engine.handle(ctx(Direction::FromHost, &bytes));

        assert_eq!(outcome.verdict, Verdict::Accept);
        assert!(engine.emitter.link_sends.borrow().is_empty());
    }

    #[test]
    fn hop_gating_suppresses_local_traffic() {
        // S5: observed TTL=62 -> hop_estimate=2 <= base_ttl=3 -> local.
        let cfg = base_config(2, 3, 32);
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();

        let bytes = build_tcp(
            Ipv4Addr::new(203, 0, 113, 10),
            Ipv4Addr::new(192, 0, 2, 5),
            443,
            54321,
            0x1000_0000,
            0x2000_0001,
            tcp_flags::SYN | tcp_flags::ACK,
            62,
            &[],
        );
        let outcome = engine.handle(ctx(Direction::FromHost, &bytes));

        assert_eq!(outcome.verdict, Verdict::Accept);
        assert!(engine.emitter.link_sends.borrow().is_empty());
    }

    #[test]
    fn case2_without_cached_srcinfo_just_accepts() {
        let cfg = base_config(1, 3, 32);
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();

        let bytes = build_tcp(
            Ipv4Addr::new(192, 0, 2, 5),
            Ipv4Addr::new(198, 51, 100, 7),
            443,
            40000,
            0x3000_0000,
            0x4000_0001,
            tcp_flags::SYN | tcp_flags::ACK,
            64,
            &[],
        );
        let outcome = engine.handle(ctx(Direction::ToHost, &bytes));

        assert_eq!(outcome.verdict, Verdict::Accept);
        assert!(engine.emitter.link_sends.borrow().is_empty());
    }

    #[test]
    fn case2_drops_and_reemits_when_srcinfo_cached() {
        // S2 shape: cache a prior SYN's TTL for the remote, then feed
        // the SYN-ACK going back out to it.
        let cfg = base_config(1, 3, 32);
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();
        engine
            .srcinfo
            .put(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7)), 58, [9; 8]);

        let bytes = build_tcp(
            Ipv4Addr::new(192, 0, 2, 5),
            Ipv4Addr::new(198, 51, 100, 7),
            443,
            40000,
            0x3000_0000,
            0x4000_0001,
            tcp_flags::SYN | tcp_flags::ACK,
            64,
            &[],
        );
        let outcome = engine.handle(ctx(Direction::ToHost, &bytes));

        assert_eq!(outcome.verdict, Verdict::Drop);
        // one forged segment plus one re-emit of the original
        assert_eq!(engine.emitter.link_sends.borrow().len(), 2);
    }

    #[test]
    fn case3_strips_tfo_and_records_srcinfo() {
        let cfg = base_config(1, 3, 32);
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();

        let options = [0x22, 0x08, 1, 2, 3, 4, 5, 6, 0x01, 0x01];
        let opt_len = options.len();
        let doff_words = (20 + opt_len).div_ceil(4);
        let padded_len = doff_words * 4 - 20;
        let mut padded = options.to_vec();
        padded.resize(padded_len, 0x01);

        let mut bytes = build_tcp(
            Ipv4Addr::new(198, 51, 100, 7),
            Ipv4Addr::new(192, 0, 2, 5),
            40000,
            443,
            1,
            0,
            tcp_flags::SYN,
            55,
            &[],
        );
        // widen the data offset to fit the TFO option and re-flag SYN
        bytes[32] = (doff_words as u8) << 4;
        bytes.splice(40..40, padded);
        bytes[33] = tcp_flags::SYN;
        let new_total = bytes.len() as u16;
        bytes[2..4].copy_from_slice(&new_total.to_be_bytes());

        let outcome = engine.handle(ctx(Direction::FromHost, &bytes));
        assert_eq!(outcome.verdict, Verdict::Accept);
        assert!(
            engine
                .srcinfo
                .get(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7)))
                .is_some()
        );
    }

    #[test]
    fn case4_outbound_syn_requires_outbound_enabled() {
        let mut cfg = base_config(1, 3, 32);
        cfg.process_outbound = false;
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();

        let bytes = build_tcp(
            Ipv4Addr::new(192, 0, 2, 5),
            Ipv4Addr::new(198, 51, 100, 7),
            40000,
            443,
            1,
            0,
            tcp_flags::SYN,
            64,
            &[],
        );
        let outcome = engine.handle(ctx(Direction::ToHost, &bytes));
        assert_eq!(outcome.verdict, Verdict::Accept);
        assert!(outcome.modified_bytes.is_none());
    }

    #[test]
    fn case4_strips_tfo_when_present() {
        let cfg = base_config(1, 3, 32);
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();

        let options = [0x22, 0x08, 1, 2, 3, 4, 5, 6, 0x01, 0x01];
        let opt_len = options.len();
        let doff_words = (20 + opt_len).div_ceil(4);
        let padded_len = doff_words * 4 - 20;
        let mut padded = options.to_vec();
        padded.resize(padded_len, 0x01);

        let mut bytes = build_tcp(
            Ipv4Addr::new(192, 0, 2, 5),
            Ipv4Addr::new(198, 51, 100, 7),
            40000,
            443,
            1,
            0,
            tcp_flags::SYN,
            64,
            &[],
        );
        bytes[32] = (doff_words as u8) << 4;
        bytes.splice(40..40, padded);
        bytes[33] = tcp_flags::SYN;
        let new_total = bytes.len() as u16;
        bytes[2..4].copy_from_slice(&new_total.to_be_bytes());

        let outcome = engine.handle(ctx(Direction::ToHost, &bytes));
        assert_eq!(outcome.verdict, Verdict::Accept);
        assert!(outcome.modified_bytes.is_some());
    }

    #[test]
    fn case5_injects_exactly_once_per_threshold() {
        // S4: threshold=32, one injection per 32 non-control packets.
        let cfg = base_config(1, 1, 32);
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();

        let mk = |seq: u32| {
            build_tcp(
                Ipv4Addr::new(203, 0, 113, 10),
                Ipv4Addr::new(192, 0, 2, 5),
                443,
                54321,
                seq,
                9000,
                tcp_flags::ACK,
                54,
                b"x",
            )
        };

        for i in 0..31 {
            let bytes = mk(i);
            let outcome = engine.handle(ctx(Direction::FromHost, &bytes));
            assert_eq!(outcome.verdict, Verdict::Accept);
        }
        assert!(engine.emitter.link_sends.borrow().is_empty());

        let bytes = mk(31);
        let outcome = engine.handle(ctx(Direction::FromHost, &bytes));
        assert_eq!(outcome.verdict, Verdict::Accept);
        assert_eq!(engine.emitter.link_sends.borrow().len(), 1);
    }

    #[test]
    fn case7_fin_clears_conntrack_state() {
        let cfg = base_config(1, 1, 2);
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();

        let data = build_tcp(
            Ipv4Addr::new(203, 0, 113, 10),
            Ipv4Addr::new(192, 0, 2, 5),
            443,
            54321,
            1,
            9000,
            tcp_flags::ACK,
            54,
            b"x",
        );
        engine.handle(ctx(Direction::FromHost, &data));

        let fin = build_tcp(
            Ipv4Addr::new(203, 0, 113, 10),
            Ipv4Addr::new(192, 0, 2, 5),
            443,
            54321,
            2,
            9000,
            tcp_flags::FIN | tcp_flags::ACK,
            54,
            &[],
        );
        let outcome = engine.handle(ctx(Direction::FromHost, &fin));
        assert_eq!(outcome.verdict, Verdict::Accept);

        // connection state was reset: the next established segment
        // starts counting from zero again, not from where FIN left off.
        let data2 = build_tcp(
            Ipv4Addr::new(203, 0, 113, 10),
            Ipv4Addr::new(192, 0, 2, 5),
            443,
            54321,
            3,
            9000,
            tcp_flags::ACK,
            54,
            b"x",
        );
        engine.handle(ctx(Direction::FromHost, &data2));
        assert!(engine.emitter.link_sends.borrow().is_empty());
    }

    #[test]
    fn disabled_address_family_passes_through_untouched() {
        let mut cfg = base_config(1, 1, 2);
        cfg.use_ipv4 = false;
        let emitter = RecordingEmitter::default();
        let mut engine = InjectionEngine::new(cfg, emitter, false).unwrap();

        let bytes = build_tcp(
            Ipv4Addr::new(203, 0, 113, 10),
            Ipv4Addr::new(192, 0, 2, 5),
            443,
            54321,
            0x1000_0000,
            0x2000_0001,
            tcp_flags::SYN | tcp_flags::ACK,
            54,
            &[],
        );
        let outcome = engine.handle(ctx(Direction::FromHost, &bytes));
        assert_eq!(outcome.verdict, Verdict::Accept);
        assert!(engine.emitter.link_sends.borrow().is_empty());
    }
}
