#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
use criterion::{Criterion, criterion_group, criterion_main};
use etherparse::PacketBuilder;
use pcap_dissect::{
    LinkType,
    byte_order::Endianness,
    dissect::{DissectionHandler, Dissector, EthernetFrame, UdpDatagram},
    pcap_ng::{
        blocks::{InterfaceDescriptionBlock, SectionHeaderBlock},
        sync::{SyncPcapNgReader, SyncPcapNgWriter},
    },
    pipeline::{CaptureHandler, CapturePipeline, PipelineConfig},
    timestamp::CaptureTimestamp,
};
use std::{
    hint::black_box,
    io::Cursor,
    sync::atomic::{AtomicUsize, Ordering},
};

fn udp_frame(payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4([192, 168, 1, 1], [192, 168, 1, 2], 20)
        .udp(21, 1234);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

fn capture(packets: u32) -> Vec<u8> {
    let mut writer =
        SyncPcapNgWriter::new(Vec::new(), SectionHeaderBlock::new(Endianness::LittleEndian))
            .unwrap();
    writer
        .add_interface(InterfaceDescriptionBlock::new(LinkType::Ethernet, 0))
        .unwrap();
    let frame = udp_frame(&[0xAB; 512]);
    for i in 0..packets {
        writer
            .write_packet(0, CaptureTimestamp::from_micros(i, 0), &frame, None)
            .unwrap();
    }
    writer.into_inner()
}

#[derive(Default)]
struct PayloadBytes(AtomicUsize);
impl DissectionHandler for PayloadBytes {
    fn udp_datagram_dissected(&self, datagram: &UdpDatagram<'_>) {
        self.0.fetch_add(datagram.payload().len(), Ordering::Relaxed);
    }
}
impl CaptureHandler for PayloadBytes {}

fn read_blocks(c: &mut Criterion) {
    let content = capture(1000);
    c.bench_function("read_pcapng_packets", |b| {
        b.iter(|| {
            let mut reader = SyncPcapNgReader::new(Cursor::new(&content)).unwrap();
            while let Some(packet) = reader.next_packet().unwrap() {
                black_box(packet);
            }
        })
    });
}

fn dissect_frames(c: &mut Criterion) {
    let frame = udp_frame(&[0xAB; 512]);
    let handler = PayloadBytes::default();
    let mut dissector = Dissector::new();
    c.bench_function("dissect_udp_frame", |b| {
        b.iter(|| {
            let frame = EthernetFrame::parse(black_box(&frame)).unwrap();
            dissector.dissect_frame(&frame, &handler).unwrap();
        })
    });
}

fn run_pipeline(c: &mut Criterion) {
    let content = capture(1000);
    c.bench_function("capture_pipeline", |b| {
        b.iter(|| {
            let pipeline =
                CapturePipeline::new(Cursor::new(&content), PipelineConfig::default()).unwrap();
            let handler = PayloadBytes::default();
            black_box(pipeline.run(&handler).unwrap());
        })
    });
}

criterion_group!(
    name = dissect;
    config = Criterion::default().sample_size(50);
    targets = read_blocks, dissect_frames, run_pipeline
);
criterion_main!(dissect);
